//! Native preview of the backdrop.
//!
//! ```text
//! sdf-preview [depth|normal] [--solid] [--still] [--resolution N]
//! ```

#[cfg(not(target_arch = "wasm32"))]
fn main() -> anyhow::Result<()> {
    use anyhow::{Context, bail};
    use sdf_backdrop::settings::Settings;

    let mut settings = Settings::default();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--solid" => settings.wireframe = false,
            "--still" => settings.auto_rotate = false,
            "--resolution" => {
                settings.resolution = args
                    .next()
                    .context("--resolution needs a value")?
                    .parse()
                    .context("--resolution needs a whole number")?;
            }
            flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
            mode => settings.material = mode.parse()?,
        }
    }
    settings.resolution = settings
        .resolution
        .min(sdf_backdrop::controller::MAX_RESOLUTION);
    sdf_backdrop::flow::run(settings)
}

#[cfg(target_arch = "wasm32")]
fn main() {}

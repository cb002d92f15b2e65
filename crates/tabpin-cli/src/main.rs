//! Entry point for the `tabpin` binary.

#[cfg(target_os = "linux")]
use anyhow::Context;
#[cfg(target_os = "linux")]
use clap::Parser;
#[cfg(target_os = "linux")]
use tracing_subscriber::EnvFilter;

#[cfg(target_os = "linux")]
use tabpin_cli::apply::{AppliedMapping, MapperService};
#[cfg(target_os = "linux")]
use tabpin_cli::backend::{NativeSession, PointerDevices};
#[cfg(target_os = "linux")]
use tabpin_cli::cli::{Action, Cli, Target};
#[cfg(target_os = "linux")]
use tabpin_cli::config::{load_config, Config};

#[cfg(target_os = "linux")]
fn main() -> anyhow::Result<()> {
    // Default to info-level logs; RUST_LOG overrides.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref()).context("loading configuration")?;

    let session = NativeSession::open()?;
    let mapper = MapperService::new(&session, &session);

    match cli.action()? {
        Action::ListOutputs => list_outputs(&mapper),
        Action::ListDevices => list_devices(&session),
        Action::Reset(target) => reset(&mapper, &cli, &config, target),
        Action::Apply(target) => apply(&mapper, &session, &cli, &config, target),
    }
}

#[cfg(target_os = "linux")]
fn list_outputs(mapper: &MapperService<'_>) -> anyhow::Result<()> {
    let (screen, topology) = mapper.topology()?;
    println!("screen: {}x{}", screen.width(), screen.height());
    for (index, region) in topology.regions().iter().enumerate() {
        let name = region.name.as_deref().unwrap_or("(unnamed)");
        println!(
            "{index}: {name} {}x{}+{}+{} ({}x{} mm)",
            region.rect.width(),
            region.rect.height(),
            region.rect.left,
            region.rect.top,
            region.width_mm,
            region.height_mm,
        );
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn list_devices(devices: &dyn PointerDevices) -> anyhow::Result<()> {
    let pointers = devices.absolute_pointers()?;
    if pointers.is_empty() {
        println!("no pointer devices with absolute axes");
        return Ok(());
    }
    for pointer in &pointers {
        println!("{}: {}", pointer.id, pointer.name);
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn reset(
    mapper: &MapperService<'_>,
    cli: &Cli,
    config: &Config,
    target: Target,
) -> anyhow::Result<()> {
    let options = cli.map_options(config, None);
    let verb = if options.dry_run { "would restore" } else { "restored" };
    match target {
        Target::Device(device) => {
            mapper.reset(device, options.verify, options.dry_run)?;
            println!("{verb} device {device} to the full screen");
        }
        Target::AllPointers => {
            let count = mapper.reset_all(options.verify, options.dry_run)?;
            println!("{verb} {count} devices to the full screen");
        }
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn apply(
    mapper: &MapperService<'_>,
    devices: &dyn PointerDevices,
    cli: &Cli,
    config: &Config,
    target: Target,
) -> anyhow::Result<()> {
    match target {
        Target::Device(device) => {
            // Profiles match on the device's name, so look it up first.
            let pointers = devices.absolute_pointers()?;
            let name = pointers
                .iter()
                .find(|pointer| pointer.id == device)
                .map(|pointer| pointer.name.clone());
            let profile = name.as_deref().and_then(|name| config.profile_for(name));
            let options = cli.map_options(config, profile);
            let selector = cli.output_selector(profile);
            let mapping = mapper.apply(&selector, device, &options)?;
            print_mapping(&mapping);
        }
        Target::AllPointers => {
            // Batch mode skips profiles so every device is treated alike.
            let options = cli.map_options(config, None);
            let selector = cli.output_selector(None);
            for mapping in mapper.apply_all(&selector, &options)? {
                print_mapping(&mapping);
            }
        }
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn print_mapping(mapping: &AppliedMapping) {
    let verb = if mapping.written { "mapped" } else { "would map" };
    let name = mapping.output_name.as_deref().unwrap_or("(unnamed)");
    println!(
        "{verb} device {} to output {} ({}): {}",
        mapping.device, mapping.region_index, name, mapping.transform
    );
}

#[cfg(not(target_os = "linux"))]
fn main() -> anyhow::Result<()> {
    anyhow::bail!("tabpin drives X11 input devices and needs a Linux host")
}

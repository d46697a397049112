use anyhow::Context;
use clap::Parser;
use person_sensor::{bus::scan, Bus, Observation, PersonSensor, ScriptedBus, Sensation, Sensor};
use runtime::{describe_face, logging::init_logging, scan_grid, Cli, Command};
use tokio::sync::mpsc;
use tracing::{info, warn};

fn open_bus(cli: &Cli) -> anyhow::Result<Box<dyn Bus>> {
    if let Some(path) = &cli.script {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading script {}", path.display()))?;
        let bus = ScriptedBus::from_json(cli.address, &json, cli.layout.into())?.cycle();
        info!(script = %path.display(), "replaying scripted frames");
        return Ok(Box::new(bus));
    }
    open_hardware(cli)
}

#[cfg(feature = "linux")]
fn open_hardware(cli: &Cli) -> anyhow::Result<Box<dyn Bus>> {
    let bus = person_sensor::linux::LinuxBus::open(&cli.bus)
        .with_context(|| format!("opening {}", cli.bus.display()))?;
    info!(bus = %cli.bus.display(), address = cli.address, "using i2c adapter");
    Ok(Box::new(bus))
}

#[cfg(not(feature = "linux"))]
fn open_hardware(_cli: &Cli) -> anyhow::Result<Box<dyn Bus>> {
    anyhow::bail!("built without the `linux` feature; pass --script to replay frames")
}

fn report(s: &Sensation, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string(s)?);
        return Ok(());
    }
    match &s.what {
        Observation::Faces(frame) => {
            info!("{} faces found", frame.num_faces());
            for (i, face) in frame.faces().iter().enumerate() {
                info!("{}", describe_face(i, face));
            }
        }
        Observation::NoData { reason } => info!(%reason, "no person sensor results"),
        Observation::CalibrationStarted { id } => info!(id, "calibrating new identity"),
        Observation::CalibrationFinished => info!("done calibrating"),
        Observation::CapacityExhausted => info!("all identities assigned"),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_logging();
    let cli = Cli::parse();
    let mut bus = open_bus(&cli)?;

    if cli.command == Some(Command::Scan) {
        let found = scan(&mut bus).await;
        print!("{}", scan_grid(&found));
        println!("Done.");
        return Ok(());
    }

    let mut sensor = PersonSensor::new(bus, cli.config());
    if let Err(e) = sensor.configure().await {
        warn!(error = %e, "could not configure sensor; polling anyway");
    }

    let (tx, mut rx) = mpsc::channel(16);
    let worker = tokio::spawn(async move { sensor.run(tx).await });
    loop {
        tokio::select! {
            Some(s) = rx.recv() => report(&s, cli.json)?,
            _ = tokio::signal::ctrl_c() => {
                info!("interrupted");
                break;
            }
        }
    }
    drop(rx);
    worker.abort();
    Ok(())
}

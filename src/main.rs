use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};
use sx1280_rs::logging::hex_string;
use sx1280_rs::radio::Command;
use sx1280_rs::{init_logger, hz_to_pll, pll_to_hz, RadioConfig, Timeout};

#[derive(Parser)]
#[command(name = "sx1280-cli")]
#[command(about = "CLI tool for the SX1280 2.4 GHz transceiver")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a JSON config and print what would be written to the chip
    Check { config: PathBuf },
    /// Convert a frequency to PLL steps and back
    Freq { hz: u32 },
    /// Show how a timeout is counted by the chip
    Timeout { us: u32 },
    /// Print every received frame until interrupted
    #[cfg(feature = "raspberry-pi")]
    Listen {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Transmit one frame given as hex
    #[cfg(feature = "raspberry-pi")]
    Send {
        #[arg(short, long)]
        config: PathBuf,
        payload: String,
    },
}

fn main() -> Result<()> {
    init_logger();

    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => check(&config)?,
        Commands::Freq { hz } => {
            let pll = hz_to_pll(hz);
            println!("{hz} Hz -> {pll} PLL steps (0x{pll:06X}) -> {} Hz", pll_to_hz(pll));
        }
        Commands::Timeout { us } => {
            let timeout = Timeout::from_us(us).context("timeout out of range")?;
            println!(
                "{us} us -> base {} ns, count {}, realized {} ns",
                timeout.base.ns(),
                timeout.count,
                timeout.duration_ns()
            );
        }
        #[cfg(feature = "raspberry-pi")]
        Commands::Listen { config } => pi::listen(&load_config(&config)?)?,
        #[cfg(feature = "raspberry-pi")]
        Commands::Send { config, payload } => {
            let data = hex::decode(payload.trim()).context("payload is not valid hex")?;
            pi::send(&load_config(&config)?, data)?
        }
    }

    Ok(())
}

fn load_config(path: &Path) -> Result<RadioConfig> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let config: RadioConfig = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(config)
}

fn check(path: &Path) -> Result<()> {
    let config = load_config(path)?;
    let validated = config.validate().context("invalid configuration")?;
    let chip = &validated.chip;

    println!("mode:        {}", chip.mode);
    println!(
        "frequency:   {} Hz ({} PLL steps)",
        chip.rf_frequency.hz(),
        chip.rf_frequency.pll()
    );
    println!("power:       {} dBm", chip.power.dbm());
    println!("ramp:        {} us", chip.ramp_time.us());
    println!("tx timeout:  {}", chip.tx_timeout);
    println!("modulation:  {}", hex_string(&chip.modulation.encode()));
    println!("packet:      {}", hex_string(&chip.packet.encode()));

    let limits = chip.frame_limits();
    println!("frame size:  {}..={} bytes", limits.start(), limits.end());

    let writes = chip.registers.commands(chip.mode);
    if writes.is_empty() {
        println!("registers:   none");
    }
    for cmd in writes {
        if let Command::WriteRegister { address, data } = cmd {
            println!("register:    0x{address:04X} <- {}", hex_string(&data));
        } else {
            bail!("unexpected register command {cmd:?}");
        }
    }
    Ok(())
}

#[cfg(feature = "raspberry-pi")]
mod pi {
    use anyhow::{bail, Context, Result};
    use std::time::Duration;
    use sx1280_rs::logging::hex_string;
    use sx1280_rs::transport::{PinMap, RaspberryPiTransport};
    use sx1280_rs::{RadioConfig, RadioEvent, Session};

    fn open(config: &RadioConfig) -> Result<RaspberryPiTransport> {
        let defaults = PinMap::default();
        let mut pins = PinMap {
            dio: [None, None, None],
            ..defaults.clone()
        };
        for line in &config.host.dio_lines {
            let idx = usize::from(line.saturating_sub(1)).min(2);
            pins.dio[idx] = defaults.dio[idx];
        }
        if !config.host.reset_line {
            pins.reset = None;
        }
        RaspberryPiTransport::builder()
            .pins(pins)
            .build()
            .context("failed to open the Raspberry Pi SPI/GPIO")
    }

    pub fn listen(config: &RadioConfig) -> Result<()> {
        let (session, events) =
            Session::start(open(config)?, config).context("radio setup failed")?;
        log::info!("Listening in {} mode", config.mode);
        for event in events.iter() {
            match event {
                RadioEvent::Received(frame) => println!(
                    "rx {} bytes rssi {} dBm snr {:?}: {}",
                    frame.data.len(),
                    frame.rssi_dbm,
                    frame.snr_db,
                    hex_string(&frame.data)
                ),
                other => log::debug!("{other:?}"),
            }
        }
        session.shutdown().context("shutdown failed")?;
        Ok(())
    }

    pub fn send(config: &RadioConfig, data: Vec<u8>) -> Result<()> {
        let (session, events) =
            Session::start(open(config)?, config).context("radio setup failed")?;
        session.submit(data).context("submit rejected")?;
        let outcome = loop {
            match events.recv_timeout(Duration::from_secs(5)) {
                Ok(RadioEvent::TransmitDone { len }) => break Ok(len),
                Ok(RadioEvent::TransmitDropped { len, reason }) => {
                    break Err(format!("{len}-byte frame dropped: {reason:?}"))
                }
                Ok(_) => continue,
                Err(e) => break Err(format!("no transmit outcome: {e}")),
            }
        };
        session.shutdown().context("shutdown failed")?;
        match outcome {
            Ok(len) => {
                println!("sent {len} bytes");
                Ok(())
            }
            Err(msg) => bail!(msg),
        }
    }
}

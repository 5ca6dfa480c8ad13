use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use std::time::Duration;
use sx1280_rs::radio::params::{GfskBitrate, LoraPreamble};
use sx1280_rs::radio::{Command, ModeProfiles, ModulationParams, PacketParams, Setting};
use sx1280_rs::{hz_to_pll, RadioConfig, RadioMode, Timeout};

// Encoders run once per configure call; they should stay well under a microsecond.

fn benchmark_unit_conversions(c: &mut Criterion) {
    let mut group = c.benchmark_group("unit_conversions");
    group.measurement_time(Duration::from_secs(5));

    group.bench_function("hz_to_pll", |b| {
        b.iter(|| hz_to_pll(black_box(2_450_000_000)));
    });

    for us in [15u32, 1_000, 2_000_000, 200_000_000] {
        group.bench_with_input(BenchmarkId::new("timeout_from_us", us), &us, |b, &us| {
            b.iter(|| Timeout::from_us(black_box(us)));
        });
    }

    for bits in [8u32, 12, 24, 15 << 15] {
        group.bench_with_input(BenchmarkId::new("lora_preamble", bits), &bits, |b, &bits| {
            b.iter(|| LoraPreamble::from_bits(black_box(bits)));
        });
    }

    group.bench_function("gfsk_bitrate_lookup", |b| {
        b.iter(|| GfskBitrate::from_kbps(black_box(125), black_box(300)));
    });

    group.finish();
}

fn benchmark_block_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("block_codec");
    let profiles = ModeProfiles::default();

    for mode in RadioMode::ALL {
        let profile = profiles.get(mode).clone();
        group.bench_with_input(BenchmarkId::new("encode", mode), &profile, |b, p| {
            b.iter(|| (black_box(p.modulation.encode()), black_box(p.packet.encode())));
        });

        let modulation = profile.modulation.encode();
        let packet = profile.packet.encode();
        group.bench_with_input(BenchmarkId::new("decode", mode), &mode, |b, &mode| {
            b.iter(|| {
                let _ = ModulationParams::decode(mode, black_box(modulation));
                let _ = PacketParams::decode(mode, black_box(packet));
            });
        });
    }

    group.finish();
}

fn benchmark_configuration(c: &mut Criterion) {
    let mut group = c.benchmark_group("configuration");
    let config = RadioConfig::default();

    group.bench_function("validate_default", |b| {
        b.iter(|| black_box(&config).validate());
    });

    let validated = config.validate().unwrap();
    group.bench_function("setup_commands", |b| {
        b.iter(|| {
            let commands = validated.chip.setup_commands();
            commands.iter().map(Command::segments).count()
        });
    });

    let lora = validated.profiles.lora.clone();
    group.bench_function("apply_spreading_factor", |b| {
        let setting = Setting::Lora(sx1280_rs::radio::LoraSetting::SpreadingFactor(7));
        b.iter(|| lora.apply(black_box(&setting)));
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_unit_conversions,
    benchmark_block_codec,
    benchmark_configuration
);
criterion_main!(benches);

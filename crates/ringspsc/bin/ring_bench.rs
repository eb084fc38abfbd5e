use anyhow::{Context, Result};
use ringspsc_rs::harness::{self, HarnessConfig, HarnessReport, Transport};
use ringspsc_rs::probe::{self, LoadKind};
use ringspsc_rs::{init_tracing, PublishMode, RetryPolicy};

const TRANSFERS: u64 = 10_000_000; // 10M values per run
const PROBE_LOADS: u64 = 100_000_000;

fn print_row(label: &str, ring_bits: u8, report: &HarnessReport) {
    let (put_spins, get_spins, puts_full, gets_empty, swaps) = report.counters.map_or(
        (
            "-".to_string(),
            "-".to_string(),
            "-".to_string(),
            "-".to_string(),
            "-".to_string(),
        ),
        |c| {
            (
                c.put_spins.to_string(),
                c.get_spins.to_string(),
                c.puts_full.to_string(),
                c.gets_empty.to_string(),
                format!("{}/{}", c.swaps_succeeded, c.swaps_failed),
            )
        },
    );

    println!(
        "| {:<22} | {:>5} | {:>12.0} | {:>10} | {:>10} | {:>10} | {:>10} | {:>13} |",
        label,
        1u64 << ring_bits,
        report.ops_per_sec(),
        put_spins,
        get_spins,
        puts_full,
        gets_empty,
        swaps
    );
}

fn run_case(label: &str, config: HarnessConfig) -> Result<()> {
    let report = harness::run(&config)
        .with_context(|| format!("harness run `{}` failed", label))?;
    print_row(label, config.ring_bits, &report);
    Ok(())
}

fn main() -> Result<()> {
    init_tracing();

    println!("\nRingSPSC Benchmark");
    println!("==================");
    println!("Transfers per run: {} ({:.1}M)\n", TRANSFERS, TRANSFERS as f64 / 1_000_000.0);

    for kind in [LoadKind::Plain, LoadKind::Atomic] {
        let report = probe::measure(kind, PROBE_LOADS);
        println!(
            "{:?} loads: {:.0} loads/sec (checksum {})",
            kind,
            report.loads_per_sec(),
            report.total
        );
    }
    println!();

    println!("| Case                   | Slots | Ops/sec      | Put spins  | Get spins  | Puts full  | Gets empty | Swaps ok/fail |");
    println!("|------------------------|-------|--------------|------------|------------|------------|------------|---------------|");

    let base = HarnessConfig::default().with_transfers(TRANSFERS);

    for ring_bits in [1, 4, 10, 16] {
        run_case("ring spin", base.with_ring_bits(ring_bits))?;
    }
    run_case("ring backoff", base.with_retry(RetryPolicy::Backoff))?;
    run_case(
        "ring bounded(64)",
        base.with_retry(RetryPolicy::Bounded { max_retries: 64 }),
    )?;
    run_case(
        "ring compare-exchange",
        base.with_publish(PublishMode::CompareExchange),
    )?;
    run_case("ring pinned", base.with_pin_threads(true))?;
    run_case("ring unchecked", base.with_verify(false))?;
    run_case("channel", base.with_transport(Transport::Channel))?;

    println!("\nBenchmark complete!");
    Ok(())
}

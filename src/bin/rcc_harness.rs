// rcc-harness: runs the toolchain conformance suites.
// Usage: cargo run --bin rcc-harness [extra] [--only SUITE]...

fn main() {
    rcc_harness::cli::run();
}

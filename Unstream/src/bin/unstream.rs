fn main() -> anyhow::Result<()> {
    unstream::cli::run_cli()
}

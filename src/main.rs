fn main() -> anyhow::Result<()> {
    brain_tui::cli::run()
}

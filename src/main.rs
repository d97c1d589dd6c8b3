use anyhow::Result;

fn main() -> Result<()> {
    redwing::cli::run()
}

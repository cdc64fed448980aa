use deck_counts::{cli, env_loader};

fn main() {
    env_loader::load_dotenv();

    if let Err(err) = cli::run_catalog_updater() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

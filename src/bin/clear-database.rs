use movielens_pipeline::config::Config;
use movielens_pipeline::storage::MovieStore;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();
    let config = Config::load()?;

    println!("⚠️  WARNING: This will delete ALL data from {}!", config.database.path.display());
    println!("Press Enter to continue or Ctrl+C to cancel...");
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;

    println!("🗑️  Clearing database...");
    let mut store = MovieStore::open(&config.database.path)?;
    store.clear_all_data()?;

    println!("✅ Database cleared successfully!");
    Ok(())
}

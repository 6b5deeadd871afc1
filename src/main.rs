use podium::api::ApiServer;
use podium::config::Config;
use podium::session::SessionServer;
use podium::store::{Database, QuestionRepo};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let config = Config::from_env();

    let db = Database::open(&config.db_path)?;
    let repo = QuestionRepo::new(db);

    let api = ApiServer::bind(&format!("0.0.0.0:{}", config.api_port), repo).await?;
    let session = SessionServer::bind(&format!("0.0.0.0:{}", config.session_port)).await?;

    println!("   Podium quiz backend");
    println!("   Question bank API on 0.0.0.0:{}", config.api_port);
    println!("   Session coordinator on 0.0.0.0:{}", config.session_port);
    println!("   Press Ctrl+C to stop\n");

    tokio::try_join!(api.run(), session.run())?;
    Ok(())
}

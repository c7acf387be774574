use clap::Parser;
use dotenvy::dotenv;
use log::info;
use paymatch_server::{
    cli::{run_command, Arguments},
    config::ServerConfig,
    server::run_server,
};

#[actix_web::main]
async fn main() {
    dotenv().ok();
    env_logger::init();
    let args = Arguments::parse();
    let config = ServerConfig::from_env_or_default();
    if let Some(command) = args.command {
        if let Err(e) = run_command(command, &config).await {
            eprintln!("{e}");
        }
        return;
    }

    info!("🚀️ Starting server on {}:{}", config.host, config.port);
    match run_server(config).await {
        Ok(_) => println!("Bye!"),
        Err(e) => eprintln!("{e}"),
    }
}

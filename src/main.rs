use clap::Parser;
use ragchat::{app::state::AppState, core::chat::ChatOrchestrator};
use tokio::io::BufReader;

#[tokio::main]
async fn main() {
    let args = ragchat::config::StartArgs::parse();

    let state = match AppState::new(&args).await {
        Ok(state) => state,
        Err(e) => {
            e.print();
            std::process::exit(1);
        }
    };

    let mut chat = match ChatOrchestrator::new(state.session()) {
        Ok(chat) => chat,
        Err(e) => {
            e.print();
            std::process::exit(1);
        }
    };

    let stdin = BufReader::new(tokio::io::stdin());

    if let Err(e) = ragchat::cli::run(&mut chat, stdin, tokio::io::stdout()).await {
        e.print();
        std::process::exit(1);
    }
}

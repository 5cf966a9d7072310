use anyhow::Result;
use clap::Parser;
use tabletalk::session::DEFAULT_MAX_STEPS;
use tabletalk::{assistant, render, selector};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "tabletalk")]
#[command(about = "Ask natural-language questions about your warehouse data")]
struct Args {
    /// The question, in plain language
    question: String,

    /// Print the tool-usage trace after the answer
    #[arg(long)]
    trace: bool,

    /// Maximum oracle tool-call turns per question
    #[arg(long, default_value_t = DEFAULT_MAX_STEPS)]
    max_steps: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let assistant = assistant::shared()?;
    info!(warehouse = assistant.connection_uri(), "asking question");

    let result = assistant.answer(&args.question, args.max_steps).await?;

    println!("{}", result.final_answer);
    println!();
    let selection = selector::select_display_table(&result.steps);
    println!("{}", render::render(selection));

    if args.trace {
        println!("\n--- trace ---");
        println!("{}", render::render_trace(&result.steps));
    }

    Ok(())
}

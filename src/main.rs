use clap::{Parser, Subcommand, ValueEnum};
use postgen::{
    export,
    linkedin::{CallbackParams, DemoConnection, DemoEvent},
    logger::{self, LogLevel, LoggerConfig},
    Config, Delivery, ImageClient, Pipeline, PublishStrategy, Session, TextClient,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "postgen")]
#[command(about = "Generate a LinkedIn post and matching image from a single topic")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate content for a topic and deliver it
    Run {
        /// What the post should be about
        #[arg(long)]
        topic: String,

        /// Writing tone, e.g. "professional" or "casual"
        #[arg(long)]
        tone: Option<String>,

        #[arg(long, value_enum, default_value_t = Strategy::Manual)]
        strategy: Strategy,

        /// Where files are written for the manual and zip strategies
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Serve the browser workflow over HTTP
    #[cfg(feature = "server")]
    Serve {
        #[arg(long)]
        port: Option<u16>,
    },
    /// Walk the simulated LinkedIn connection without touching the network
    Demo,
    /// List the Bedrock models usable as alternative providers
    Models,
}

#[derive(Clone, Copy, ValueEnum)]
enum Strategy {
    /// Write post.txt and the image to disk
    Manual,
    /// Write a zip archive holding both
    Zip,
    /// Print a prefilled LinkedIn share URL
    Share,
    /// Connect through OAuth and post directly
    Linkedin,
}

impl From<Strategy> for PublishStrategy {
    fn from(strategy: Strategy) -> Self {
        match strategy {
            Strategy::Manual => PublishStrategy::Manual,
            Strategy::Zip => PublishStrategy::Zip,
            Strategy::Share => PublishStrategy::ShareLink,
            Strategy::Linkedin => PublishStrategy::Direct,
        }
    }
}

fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let level = match std::env::var("LOG_LEVEL") {
        Ok(raw) => raw.parse::<LogLevel>()?,
        Err(_) => LogLevel::Info,
    };
    logger::init_with_config(LoggerConfig::development().with_level(level))?;
    Ok(())
}

fn prompt_line(message: &str) -> io::Result<String> {
    eprint!("{}", message);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn run(
    config: &Config,
    topic: &str,
    tone: Option<&str>,
    strategy: Strategy,
    out: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Strategy::Linkedin = strategy {
        config.linkedin()?;
    }
    let pipeline = Pipeline::from_config(config).await?;
    let mut session = Session::new();

    let content = pipeline.generate(&mut session, topic, tone).await?;
    println!("{}", content.post_text());
    for failure in content.failures() {
        log::warn!("⚠️  {:?} used a placeholder ({})", failure.stage, failure.kind);
    }

    if let Strategy::Linkedin = strategy {
        let url = pipeline.authorization_url(&mut session)?;
        eprintln!("Open this URL to connect LinkedIn:\n{}", url);
        let redirect = prompt_line("Paste the URL you were redirected to: ")?;
        let callback = CallbackParams::from_redirect_url(&redirect)?;
        pipeline
            .complete_authorization(&mut session, &callback)
            .await?;
    }

    match pipeline.deliver(&mut session, strategy.into()).await? {
        Delivery::Published(post) => {
            log::info!("✅ Published {} as {}", post.id, post.author);
        }
        Delivery::Manual { post, image } => {
            let (post_path, image_path) = export::write_files(&out, &post, &image)?;
            log::info!(
                "📄 Wrote {} and {}",
                post_path.display(),
                image_path.display()
            );
        }
        Delivery::ShareLink(url) => {
            println!("{}", url);
        }
        Delivery::Archive { file_name, bytes } => {
            std::fs::create_dir_all(&out)?;
            let path = out.join(file_name);
            std::fs::write(&path, bytes)?;
            log::info!("📦 Archive written to {}", path.display());
        }
    }

    Ok(())
}

fn demo() -> Result<(), Box<dyn std::error::Error>> {
    let mut connection = DemoConnection::new().apply(DemoEvent::Connect)?;
    let state = match &connection {
        DemoConnection::AwaitingApproval { state } => state.clone(),
        _ => String::new(),
    };
    eprintln!("Simulated consent screen (state {})", state);

    let answer = prompt_line("Approve access? [y/N] ")?;
    let event = if answer.eq_ignore_ascii_case("y") {
        DemoEvent::Approve { state }
    } else {
        DemoEvent::Deny
    };
    connection = connection.apply(event)?;

    if connection.is_connected() {
        connection = connection.apply(DemoEvent::Post)?;
    }
    if let DemoConnection::Posted { member, post_id } = &connection {
        println!("{} posted {}", member, post_id);
    } else {
        println!("Connection {}", connection.label());
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_loaded = dotenv::dotenv().is_ok();
    init_logging()?;
    if !env_loaded {
        log::debug!("No .env file found, using process environment");
    }

    let cli = Cli::parse();
    logger::log_startup_info("postgen", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Models => {
            log::info!("📚 Bedrock text models:");
            for (id, name, provider) in TextClient::supported_models() {
                println!("text  {:<45} {} ({})", id, name, provider);
            }
            log::info!("🖼️  Bedrock image models:");
            for (id, name, provider) in ImageClient::supported_models() {
                println!("image {:<45} {} ({})", id, name, provider);
            }
        }
        Command::Demo => demo()?,
        Command::Run {
            topic,
            tone,
            strategy,
            out,
        } => {
            let config = load_config()?;
            run(&config, &topic, tone.as_deref(), strategy, out).await?;
        }
        #[cfg(feature = "server")]
        Command::Serve { port } => {
            let config = load_config()?;
            config.linkedin()?;
            let port = port.or(config.port).unwrap_or(8080);
            let pipeline = Pipeline::from_config(&config).await?;
            postgen::server::run(pipeline, port).await?;
        }
    }

    Ok(())
}

fn load_config() -> Result<Config, Box<dyn std::error::Error>> {
    let config = match Config::from_env().and_then(|c| c.validate().map(|_| c)) {
        Ok(config) => config,
        Err(e) => {
            log::error!("❌ {}", e);
            return Err(e.into());
        }
    };
    logger::log_config_info(&config);
    Ok(config)
}

use argh::FromArgs;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use std::path::PathBuf;

mod messages;

// defaults for the client
const DEFAULT_HOST: &str = "localhost";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_MODEL: &str = "moondream:1.8b";

#[derive(FromArgs)]
/// Relay client for describing images and checking the model server
struct ClientArgs {
    /// the host to connect to
    #[argh(option, short = 'h', default = "DEFAULT_HOST.to_string()")]
    host: String,

    /// the port to connect to
    #[argh(option, short = 'p', default = "DEFAULT_PORT")]
    port: u16,

    /// command to execute: "generate" or "health"
    #[argh(subcommand)]
    command: ClientCommands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum ClientCommands {
    Generate(GenerateCommand),
    Health(HealthCommand),
}

#[derive(FromArgs)]
/// Describe an image and translate the description
#[argh(subcommand, name = "generate")]
struct GenerateCommand {
    /// the path to the image
    #[argh(option, short = 'i')]
    image_path: PathBuf,

    /// the caption model to use
    #[argh(option, short = 'm', default = "DEFAULT_MODEL.to_string()")]
    model: String,

    /// the target language
    #[argh(option, short = 'l')]
    language: String,
}

#[derive(FromArgs)]
/// Check the model server status
#[argh(subcommand, name = "health")]
struct HealthCommand {}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: ClientArgs = argh::from_env();

    let client = reqwest::Client::new();

    // format the host and port
    let addr = format!("{}:{}", args.host, args.port);

    let response = match args.command {
        ClientCommands::Generate(command) => {
            let image = tokio::fs::read(&command.image_path).await?;
            client
                .post(format!("http://{}/generate", addr))
                .json(&messages::GenerateRequest {
                    model: command.model,
                    image: STANDARD.encode(image),
                    language: command.language,
                })
                .send()
                .await?
        }
        ClientCommands::Health(_) => client.get(format!("http://{}/health", addr)).send().await?,
    };

    let status = response.status();
    let result = response.json::<serde_json::Value>().await?;
    println!("Status: {}", status);

    if let Some(error) = result.get("error") {
        let error: messages::ErrorResponse = serde_json::from_value(error.clone())?;
        println!("Failed during {} ({}): {}", error.stage, error.kind, error.message);
        if let Some(caption) = error.partial_caption {
            println!("Caption so far: {}", caption);
        }
        return Ok(());
    }

    println!("Result: {}", serde_json::to_string_pretty(&result)?);

    Ok(())
}

use clap::{Parser, Subcommand};

use ferridyn_inventory::product::ProductInput;
use ferridyn_inventory::suggest::{SuggestionRequest, SuggestionSource};
use ferridyn_inventory::suggester_from_env;

#[derive(Parser)]
#[command(
    name = "finventory",
    about = "FerridynDB inventory — validate products and suggest categories"
)]
struct Cli {
    /// Output machine-readable JSON (default: human-readable)
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Suggest a category for a product
    Suggest {
        #[arg(long)]
        name: String,
        #[arg(long)]
        quantity: Option<String>,
        #[arg(long)]
        price: Option<String>,
        #[arg(long, help = "Current category; when set no suggestion is made")]
        existing_category: Option<String>,
    },
    /// Check product form fields
    Validate {
        #[arg(long)]
        name: String,
        #[arg(long)]
        quantity: String,
        #[arg(long)]
        price: String,
    },
}

fn source_label(source: SuggestionSource) -> &'static str {
    match source {
        SuggestionSource::Cache => "cached",
        SuggestionSource::ExternalProvider => "suggested",
        SuggestionSource::Fallback => "default",
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Suggest {
            name,
            quantity,
            price,
            existing_category,
        } => {
            let suggester = suggester_from_env()?;
            let request = SuggestionRequest {
                product_name: name,
                quantity,
                price,
                existing_category,
            };

            match suggester.suggest(request).await {
                Ok(result) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&result)?);
                    } else {
                        println!("{} ({})", result.label, source_label(result.source));
                    }
                }
                Err(e) if e.is_informational() => {
                    if cli.json {
                        println!("{}", serde_json::json!({ "notice": e.to_string() }));
                    } else {
                        println!("{e}");
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }
        Command::Validate {
            name,
            quantity,
            price,
        } => {
            let input = ProductInput {
                name,
                quantity,
                price,
            };
            match input.validate() {
                Ok(product) => {
                    if cli.json {
                        println!("{}", serde_json::to_string_pretty(&product)?);
                    } else {
                        println!(
                            "{}: quantity {}, price {:.2}",
                            product.name, product.quantity, product.price
                        );
                    }
                }
                Err(e) => {
                    eprintln!("error: {e} (invalid {})", e.field.as_str());
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_suggest_args() {
        let cli = Cli::try_parse_from([
            "finventory",
            "--json",
            "suggest",
            "--name",
            "USB Cable",
            "--price",
            "25",
        ])
        .unwrap();
        assert!(cli.json);
        match cli.command {
            Command::Suggest {
                name,
                price,
                quantity,
                existing_category,
            } => {
                assert_eq!(name, "USB Cable");
                assert_eq!(price.as_deref(), Some("25"));
                assert!(quantity.is_none());
                assert!(existing_category.is_none());
            }
            _ => panic!("expected suggest"),
        }
    }

    #[test]
    fn test_validate_requires_all_fields() {
        assert!(Cli::try_parse_from(["finventory", "validate", "--name", "Lamp"]).is_err());
    }
}

//! The `aperture status` command: a single status check for a batch.

use aperture_core::batch::{BatchHandle, ProviderFactory};
use aperture_core::Config;
use clap::Args;

use super::ProviderArg;

/// Arguments for the `status` command.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Batch id printed at submission time
    pub batch_id: String,

    /// Provider the batch was submitted to
    #[arg(long, value_enum, default_value = "anthropic")]
    pub provider: ProviderArg,
}

/// Execute the status command.
pub async fn execute(args: StatusArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let kind = args.provider.kind();

    let provider = ProviderFactory::create(kind, &config.providers)?;
    let handle = BatchHandle {
        batch_id: args.batch_id,
        provider: kind,
    };

    let status = provider.status(&handle).await?;

    println!("Batch:     {}", handle.batch_id);
    println!("Provider:  {}", provider.name());
    println!("Status:    {}", status.native_status);
    println!(
        "Requests:  {} processing, {} succeeded, {} errored, {} canceled, {} expired",
        status.counts.processing,
        status.counts.succeeded,
        status.counts.errored,
        status.counts.canceled,
        status.counts.expired
    );
    if let Some(created) = status.created_at {
        println!("Created:   {}", created.to_rfc3339());
    }
    if let Some(ended) = status.ended_at {
        println!("Ended:     {}", ended.to_rfc3339());
    }
    if let Some(expires) = status.expires_at {
        println!("Expires:   {}", expires.to_rfc3339());
    }

    if let Some(reason) = status.failure_reason() {
        println!();
        println!("The batch {reason}; results will be incomplete or missing.");
    } else if status.is_terminal() {
        println!();
        println!("Results are ready. Retrieve them with:");
        println!("  aperture resume {} --provider {}", handle.batch_id, args.provider);
    }

    Ok(())
}

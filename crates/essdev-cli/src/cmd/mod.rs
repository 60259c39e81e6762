pub mod add;
pub mod del;
pub mod list;

use essdev_core::dispatch::Delivery;
use essdev_core::ops::EditOutcome;
use serde::Serialize;

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Print the resulting document, then the equivalent dispatch command for
/// a dry run.
fn report(outcome: &EditOutcome) -> anyhow::Result<()> {
    print_json(&outcome.document)?;
    match &outcome.delivery {
        Delivery::Previewed { command } => println!("{command}"),
        Delivery::Sent { status } => {
            tracing::debug!(status, path = %outcome.payload_path.display(), "dispatch accepted");
        }
    }
    Ok(())
}

//! Prints the OpenAPI document so clients can be generated without a running server.

use raffle_wheel_back::services::documentation;

fn main() -> Result<(), serde_json::Error> {
    println!("{}", documentation::document().to_pretty_json()?);
    Ok(())
}

//! # card-scan CLI
//!
//! Command-line front end for the card scanner.
//!
//! ## Usage
//! ```bash
//! card-scan index manifest.json
//! card-scan identify ~/captures --output json
//! ```

mod cli;

use card_scan::Result;

fn main() -> Result<()> {
    cli::run()
}

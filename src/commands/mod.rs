/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint:

- `run`  : Run the bridge until a shutdown signal
- `tail` : Subscribe to bridge messages and print them
*/

pub mod r#run;
pub mod tail;

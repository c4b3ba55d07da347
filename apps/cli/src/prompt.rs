//! Interactive input: ask on the terminal until the answer validates.

use color_eyre::eyre::Result;
use dialoguer::Input;

/// Read one line from the terminal.
pub(crate) fn ask_text(prompt: &str) -> Result<String> {
    let answer: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()?;
    Ok(answer.trim().to_string())
}

/// Ask until `parse` accepts the answer. Only input errors are retried.
pub(crate) fn ask_until<T>(
    prompt: &str,
    parse: impl Fn(&str) -> promptkit_shared::Result<T>,
) -> Result<T> {
    loop {
        let answer = ask_text(prompt)?;
        match parse(&answer) {
            Ok(value) => return Ok(value),
            Err(e) if e.is_recoverable_input() => eprintln!("  {e}"),
            Err(e) => return Err(e.into()),
        }
    }
}

/// Use the flag value when given, otherwise ask. A bad flag value is fatal.
pub(crate) fn flag_or_ask<T>(
    flag: Option<String>,
    prompt: &str,
    parse: impl Fn(&str) -> promptkit_shared::Result<T>,
) -> Result<T> {
    match flag {
        Some(value) => Ok(parse(&value)?),
        None => ask_until(prompt, parse),
    }
}

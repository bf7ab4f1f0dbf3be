/// One line typed at the interactive prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    /// Blank line: sends the selected suggestion, if any
    Empty,
    Exit,
    Help,
    History,
    Models,
    /// Switch semantic model
    Model(String),
    Clear,
    /// Send the selected suggestion
    Send,
    /// Select suggestion N (1-based) of the last answer
    Suggest(usize),
    /// Rate the last answer
    Feedback {
        positive: bool,
        comment: Option<String>,
    },
    Question(String),
    /// A slash command that could not be understood, with the reason
    Invalid(String),
}

pub fn parse_input(line: &str) -> Input {
    let line = line.trim();
    if line.is_empty() {
        return Input::Empty;
    }
    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
        return Input::Exit;
    }
    let Some(command) = line.strip_prefix('/') else {
        return Input::Question(line.to_string());
    };

    let (name, rest) = match command.split_once(char::is_whitespace) {
        Some((name, rest)) => (name, rest.trim()),
        None => (command, ""),
    };
    let rest_opt = (!rest.is_empty()).then(|| rest.to_string());

    match name.to_lowercase().as_str() {
        "help" | "?" => Input::Help,
        "exit" | "quit" => Input::Exit,
        "history" => Input::History,
        "models" => Input::Models,
        "clear" => Input::Clear,
        "send" => Input::Send,
        "model" => match rest_opt {
            Some(model) => Input::Model(model),
            None => Input::Invalid("usage: /model NAME".to_string()),
        },
        "suggest" => match rest.parse::<usize>() {
            Ok(n) if n >= 1 => Input::Suggest(n),
            _ => Input::Invalid("usage: /suggest N (N starts at 1)".to_string()),
        },
        "good" | "up" => Input::Feedback {
            positive: true,
            comment: rest_opt,
        },
        "bad" | "down" => Input::Feedback {
            positive: false,
            comment: rest_opt,
        },
        other => Input::Invalid(format!("unknown command /{}; try /help", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_a_question() {
        assert_eq!(
            parse_input("  What was Q1 revenue? "),
            Input::Question("What was Q1 revenue?".to_string())
        );
        assert_eq!(parse_input("   "), Input::Empty);
        assert_eq!(parse_input("QUIT"), Input::Exit);
    }

    #[test]
    fn slash_commands() {
        assert_eq!(parse_input("/clear"), Input::Clear);
        assert_eq!(parse_input("/models"), Input::Models);
        assert_eq!(
            parse_input("/model orders.yaml"),
            Input::Model("orders.yaml".to_string())
        );
        assert_eq!(parse_input("/suggest 2"), Input::Suggest(2));
        assert_eq!(parse_input("/send"), Input::Send);
        assert_eq!(
            parse_input("/good"),
            Input::Feedback {
                positive: true,
                comment: None
            }
        );
        assert_eq!(
            parse_input("/bad wrong quarter used"),
            Input::Feedback {
                positive: false,
                comment: Some("wrong quarter used".to_string())
            }
        );
    }

    #[test]
    fn malformed_commands_are_invalid() {
        assert!(matches!(parse_input("/suggest 0"), Input::Invalid(_)));
        assert!(matches!(parse_input("/suggest two"), Input::Invalid(_)));
        assert!(matches!(parse_input("/model"), Input::Invalid(_)));
        assert!(matches!(parse_input("/frobnicate"), Input::Invalid(_)));
    }
}

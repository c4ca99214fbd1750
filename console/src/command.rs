//! Input line parsing and outcome rendering.

use engine::ProbeOutcome;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    List,
    Use(String),
    Test(String),
    Show(usize),
    Clear,
    Help,
    Quit,
    Empty,
    Invalid(String),
}

impl Command {
    /// Parse one input line. A line that is not a command is taken as a key.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((h, r)) => (h, r.trim()),
            None => (line, ""),
        };

        match head {
            "" => Command::Empty,
            "list" | "ls" => Command::List,
            "use" if rest.is_empty() => Command::Invalid("usage: use <service-id>".into()),
            "use" => Command::Use(rest.to_string()),
            "test" if rest.is_empty() => Command::Invalid("usage: test <key>".into()),
            "test" => Command::Test(rest.to_string()),
            "show" => match rest.parse::<usize>() {
                Ok(n) if n > 0 => Command::Show(n),
                _ => Command::Invalid("usage: show <n> (n starts at 1)".into()),
            },
            "clear" => Command::Clear,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            _ => Command::Test(line.to_string()),
        }
    }
}

pub const HELP: &str = "\
commands:
  list             show available services
  use <id>         select the service to test
  test <key>       probe the selected service (a bare key works too)
  show <n>         full response of result n
  clear            forget the current results
  quit             leave";

/// Outcomes shown since the last test started, numbered from 1.
#[derive(Debug, Default)]
pub struct ResultList {
    items: Vec<ProbeOutcome>,
}

impl ResultList {
    /// A new test replaces whatever the previous one showed.
    pub fn start_test(&mut self) {
        self.items.clear();
    }

    /// Record `outcome` and return its summary line.
    pub fn push(&mut self, outcome: ProbeOutcome) -> String {
        self.items.push(outcome);
        let index = self.items.len();
        summary_line(index, &self.items[index - 1])
    }

    pub fn get(&self, n: usize) -> Option<&ProbeOutcome> {
        n.checked_sub(1).and_then(|i| self.items.get(i))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }
}

/// One-line verdict, as shown in the results list.
pub fn summary_line(index: usize, outcome: &ProbeOutcome) -> String {
    if outcome.succeeded {
        format!("[{index}] ✓ {} - 有效", outcome.display_name)
    } else {
        format!("[{index}] ✗ {} - 无效", outcome.display_name)
    }
}

pub fn detail(outcome: &ProbeOutcome) -> String {
    let status = outcome
        .http_status
        .map(|s| s.to_string())
        .unwrap_or_else(|| "-".into());
    format!(
        "服务名称: {}\n状态码: {}\n状态: {}\n耗时: {} ms\n\n完整响应:\n{}",
        outcome.display_name,
        status,
        if outcome.succeeded { "有效" } else { "无效" },
        outcome.latency_ms,
        outcome.body_or_error,
    )
}

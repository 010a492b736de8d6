//! Mock MI debugger binary for integration testing
//!
//! Speaks a small subset of GDB/MI over stdin/stdout (or one TCP
//! connection) so the runner can be tested without a real debugger.
//!
//! Usage: `mock_debugger [--listen ADDR] [--exit-immediately] [--silent]`
//!
//! With `--listen` the bound address is printed on stdout before accepting.

use std::collections::BTreeSet;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;

fn main() {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--exit-immediately") {
        return;
    }
    let silent = args.iter().any(|a| a == "--silent");

    let listen = args
        .iter()
        .position(|a| a == "--listen")
        .and_then(|i| args.get(i + 1));

    match listen {
        Some(addr) => {
            let listener = match TcpListener::bind(addr.as_str()) {
                Ok(listener) => listener,
                Err(e) => {
                    eprintln!("mock_debugger: cannot listen on {addr}: {e}");
                    std::process::exit(1);
                }
            };
            if let Ok(local) = listener.local_addr() {
                println!("listening on {local}");
                std::io::stdout().flush().ok();
            }
            if let Ok((stream, _)) = listener.accept() {
                if let Ok(reader) = stream.try_clone() {
                    serve(BufReader::new(reader), stream, silent);
                }
            }
        }
        None => {
            let stdin = std::io::stdin();
            let stdout = std::io::stdout();
            serve(stdin.lock(), stdout.lock(), silent);
        }
    }
}

fn serve<R: BufRead, W: Write>(reader: R, mut writer: W, silent: bool) {
    let mut state = MockState::default();

    if !silent {
        send_lines(&mut writer, &["=thread-group-added,id=\"i1\"".to_string(), "(gdb)".to_string()]);
    }

    for line in reader.lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() || silent {
            continue;
        }

        let mut responses = state.process_command(line);
        if state.exited {
            send_lines(&mut writer, &responses);
            break;
        }
        responses.push("(gdb)".to_string());
        send_lines(&mut writer, &responses);
    }
}

fn send_lines<W: Write>(writer: &mut W, lines: &[String]) {
    for line in lines {
        writer.write_all(line.as_bytes()).ok();
        writer.write_all(b"\n").ok();
    }
    writer.flush().ok();
}

#[derive(Default)]
struct MockState {
    next_breakpoint: u32,
    /// (line, number) of every inserted breakpoint
    breakpoints: BTreeSet<(u32, u32)>,
    file: String,
    /// Line the program is stopped at, if running
    stopped_at: Option<u32>,
    exited: bool,
}

impl MockState {
    fn process_command(&mut self, line: &str) -> Vec<String> {
        if line == "ping" {
            return vec!["pong".to_string()];
        }

        let digits = line.bytes().take_while(u8::is_ascii_digit).count();
        let (token, rest) = line.split_at(digits);

        let Some(rest) = rest.strip_prefix('-') else {
            return vec![format!(
                "{token}^error,msg=\"Undefined command: \\\"{}\\\"\"",
                escape(rest)
            )];
        };
        let (command, args) = rest.split_once(' ').unwrap_or((rest, ""));
        let args = args.trim();

        match command {
            "break-insert" => {
                let Some((file, line)) = args
                    .rsplit_once(':')
                    .and_then(|(f, l)| l.parse::<u32>().ok().map(|l| (f, l)))
                else {
                    return vec![format!("{token}^error,msg=\"Bad breakpoint location\"")];
                };
                self.next_breakpoint += 1;
                self.breakpoints.insert((line, self.next_breakpoint));
                self.file = file.to_string();
                vec![format!(
                    "{token}^done,bkpt={{number=\"{}\",type=\"breakpoint\",enabled=\"y\",file=\"{}\",line=\"{}\"}}",
                    self.next_breakpoint,
                    escape(file),
                    line
                )]
            }
            "break-list" => {
                let bkpts: Vec<String> = self
                    .breakpoints
                    .iter()
                    .map(|(line, number)| format!("bkpt={{number=\"{number}\",line=\"{line}\"}}"))
                    .collect();
                vec![format!(
                    "{token}^done,BreakpointTable={{nr_rows=\"{}\",body=[{}]}}",
                    self.breakpoints.len(),
                    bkpts.join(",")
                )]
            }
            "exec-run" => {
                self.stopped_at = None;
                let mut out = vec![
                    format!("{token}^running"),
                    "*running,thread-id=\"all\"".to_string(),
                ];
                out.push(self.advance());
                out
            }
            "exec-continue" => {
                if self.stopped_at.is_none() {
                    return vec![format!("{token}^error,msg=\"The program is not being run.\"")];
                }
                vec![
                    format!("{token}^running"),
                    "*running,thread-id=\"all\"".to_string(),
                    self.advance(),
                ]
            }
            "stack-info-frame" => match self.stopped_at {
                Some(line) => vec![format!(
                    "{token}^done,frame={{level=\"0\",file=\"{}\",line=\"{line}\"}}",
                    escape(&self.file)
                )],
                None => vec![format!("{token}^error,msg=\"No stack.\"")],
            },
            "echo" => vec![
                format!("~\"{}\\n\"", escape(args)),
                format!("{token}^done"),
            ],
            "gdb-exit" => {
                self.exited = true;
                vec![format!("{token}^exit")]
            }
            _ => vec![format!(
                "{token}^error,msg=\"Undefined MI command: {}\"",
                escape(command)
            )],
        }
    }

    /// Stop at the next breakpoint after the current line, or exit
    fn advance(&mut self) -> String {
        let from = self.stopped_at.map_or(0, |line| line + 1);
        match self.breakpoints.iter().find(|(line, _)| *line >= from) {
            Some(&(line, number)) => {
                self.stopped_at = Some(line);
                format!(
                    "*stopped,reason=\"breakpoint-hit\",disp=\"keep\",bkptno=\"{number}\",frame={{func=\"main\",file=\"{}\",line=\"{line}\"}},thread-id=\"1\"",
                    escape(&self.file)
                )
            }
            None => {
                self.stopped_at = None;
                "*stopped,reason=\"exited-normally\"".to_string()
            }
        }
    }
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

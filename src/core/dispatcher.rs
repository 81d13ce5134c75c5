use crate::config::LimitsConfig;
use crate::core::protocol::{ErrorResponse, Request, Response};
use crate::utils::error::{CalcError, Result};
use std::io::{BufRead, ErrorKind, Write};

/// Result of one request/response cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub response: Response,
    pub exit_code: i32,
}

impl Outcome {
    fn success(response: Response) -> Self {
        Self {
            response,
            exit_code: 0,
        }
    }

    fn failure(error: &CalcError) -> Self {
        Self {
            response: Response::Error(ErrorResponse::from(error)),
            exit_code: error.exit_code(),
        }
    }
}

enum State {
    AwaitingRequest,
    Dispatching(String),
    Done(Outcome),
}

/// 每次呼叫只處理一個請求：讀一行、分派、寫一行後結束
pub struct Dispatcher {
    limits: LimitsConfig,
}

impl Dispatcher {
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Parses and executes one request line.
    pub fn handle(&self, line: &str) -> Result<Response> {
        let request = Request::parse(line, &self.limits)?;
        let operation = request.operation();
        tracing::debug!(operation, "dispatching request");
        request.execute()
    }

    pub fn respond(&self, line: &str) -> Outcome {
        match self.handle(line) {
            Ok(response) => Outcome::success(response),
            Err(e) => {
                tracing::error!(kind = e.kind(), "request failed: {}", e);
                Outcome::failure(&e)
            }
        }
    }

    /// Runs one full cycle over the given streams and returns the process exit
    /// status. The response is serialized completely before anything is written.
    pub fn run<R: BufRead, W: Write>(&self, mut reader: R, mut writer: W) -> i32 {
        let mut state = State::AwaitingRequest;

        let outcome = loop {
            state = match state {
                State::AwaitingRequest => match self.read_request(&mut reader) {
                    Ok(line) => State::Dispatching(line),
                    Err(e) => {
                        tracing::error!(kind = e.kind(), "cannot read request: {}", e);
                        State::Done(Outcome::failure(&e))
                    }
                },
                State::Dispatching(line) => State::Done(self.respond(&line)),
                State::Done(outcome) => break outcome,
            };
        };

        match write_response(&mut writer, &outcome.response) {
            Ok(()) => outcome.exit_code,
            Err(e) => {
                tracing::error!("cannot write response: {}", e);
                e.exit_code()
            }
        }
    }

    fn read_request<R: BufRead>(&self, reader: R) -> Result<String> {
        let limit = self.limits.max_request_bytes;
        let mut line = String::new();

        // 多讀一個位元組以偵測超出上限
        reader
            .take(limit as u64 + 1)
            .read_line(&mut line)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidData => CalcError::malformed("request is not valid UTF-8"),
                _ => CalcError::IoError(e),
            })?;

        if line.len() > limit {
            return Err(CalcError::malformed(format!(
                "request exceeds {} bytes",
                limit
            )));
        }
        if line.trim().is_empty() {
            return Err(CalcError::malformed("empty request"));
        }

        tracing::debug!(bytes = line.len(), "request received");
        Ok(line)
    }
}

fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let body = serde_json::to_string(response)?;
    writeln!(writer, "{}", body)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn run(input: &str) -> (i32, Value) {
        run_with(LimitsConfig::default(), input)
    }

    fn run_with(limits: LimitsConfig, input: &str) -> (i32, Value) {
        let dispatcher = Dispatcher::new(limits);
        let mut output = Vec::new();
        let code = dispatcher.run(input.as_bytes(), &mut output);
        let text = String::from_utf8(output).unwrap();
        assert!(text.ends_with('\n'));
        assert_eq!(text.matches('\n').count(), 1);
        (code, serde_json::from_str(text.trim_end()).unwrap())
    }

    #[test]
    fn test_check_compatibility_success() {
        let (code, body) =
            run(r#"{"operation":"check_compatibility","donor":"O-","recipient":"A+"}"#);
        assert_eq!(code, 0);
        assert_eq!(body["compatible"], true);
        assert_eq!(body["is_universal_donor"], true);
        assert_eq!(body["is_universal_recipient"], false);
    }

    #[test]
    fn test_unknown_operation_exits_non_zero() {
        let (code, body) = run("{\"operation\":\"frobnicate\"}\n");
        assert_ne!(code, 0);
        assert_eq!(body["kind"], "unknown_operation");
        assert!(body["error"].as_str().unwrap().contains("frobnicate"));
    }

    #[test]
    fn test_empty_and_garbage_input() {
        let (code, body) = run("");
        assert_eq!(code, 1);
        assert_eq!(body["kind"], "malformed_request");

        let (code, body) = run("   \n");
        assert_eq!(code, 1);
        assert_eq!(body["kind"], "malformed_request");

        let (code, body) = run("{\"operation\":\n");
        assert_eq!(code, 1);
        assert_eq!(body["kind"], "malformed_request");
    }

    #[test]
    fn test_only_first_line_is_read() {
        let input = format!(
            "{}\n{}\n",
            json!({"operation": "check_compatibility", "donor": "A+", "recipient": "O-"}),
            json!({"operation": "frobnicate"})
        );
        let (code, body) = run(&input);
        assert_eq!(code, 0);
        assert_eq!(body["compatible"], false);
    }

    #[test]
    fn test_oversized_request_is_rejected() {
        let limits = LimitsConfig {
            max_request_bytes: 64,
            ..LimitsConfig::default()
        };
        let padding = "x".repeat(200);
        let input = format!(
            "{{\"operation\":\"check_compatibility\",\"donor\":\"O-\",\"recipient\":\"A+\",\"pad\":\"{}\"}}\n",
            padding
        );
        let (code, body) = run_with(limits, &input);
        assert_eq!(code, 1);
        assert!(body["error"].as_str().unwrap().contains("exceeds"));
    }

    #[test]
    fn test_respond_reports_exit_code() {
        let dispatcher = Dispatcher::new(LimitsConfig::default());
        let outcome =
            dispatcher.respond(r#"{"operation":"calculate_availability","donations":[]}"#);
        assert_eq!(outcome.exit_code, 0);
        assert!(!outcome.response.is_error());

        let outcome = dispatcher
            .respond(r#"{"operation":"check_compatibility","donor":"X","recipient":"A+"}"#);
        assert_eq!(outcome.exit_code, 1);
        assert!(outcome.response.is_error());
    }
}

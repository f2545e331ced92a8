use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};

use fnspec::Document;
use serde::Deserialize;
use tracing::debug;

use crate::error::ExecError;

/// A fully composed backend invocation. Built once; never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltInvocation {
    /// Backend executable name (`docker` or `kubectl`).
    pub path: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
}

/// The process-exchange collaborator: takes a built invocation and the
/// input documents, returns the transformed documents.
///
/// Spawning, stdio piping, and signal handling live behind this seam;
/// the invocation builder never touches a process directly.
pub trait FunctionExec {
    fn run(
        &mut self,
        invocation: &BuiltInvocation,
        input: Vec<Document>,
    ) -> Result<Vec<Document>, ExecError>;
}

/// Runs the invocation as a blocking child process.
///
/// The child inherits the full caller environment (the engine CLI
/// needs its auth config, and bare-`KEY` env entries rely on ambient
/// values). Input documents are written to stdin as a `---`-separated
/// stream, output is parsed back from stdout, and a non-zero exit is
/// an error carrying the captured stderr.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineExec;

impl FunctionExec for EngineExec {
    fn run(
        &mut self,
        invocation: &BuiltInvocation,
        input: Vec<Document>,
    ) -> Result<Vec<Document>, ExecError> {
        debug!(
            path = %invocation.path,
            working_dir = %invocation.working_dir.display(),
            "spawning function container"
        );

        let mut child = Command::new(&invocation.path)
            .args(&invocation.args)
            .current_dir(&invocation.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExecError::Spawn {
                path: invocation.path.clone(),
                source,
            })?;

        let payload = encode_documents(&input)?;
        let stdio_err = |source| ExecError::Stdio {
            path: invocation.path.clone(),
            working_dir: invocation.working_dir.clone(),
            source,
        };

        let mut stdin = child.stdin.take().ok_or_else(|| {
            stdio_err(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "child stdin was not captured",
            ))
        })?;

        // Feed stdin from its own thread while this one drains stdout;
        // writing and reading on the same thread deadlocks once either
        // stream outgrows the OS pipe buffer. Dropping the handle
        // closes the pipe so the function sees EOF.
        let writer = std::thread::spawn(move || stdin.write_all(payload.as_bytes()));

        let output = child.wait_with_output().map_err(stdio_err)?;
        let written = writer.join();

        if !output.status.success() {
            return Err(ExecError::NonZeroExit {
                path: invocation.path.clone(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        match written {
            Ok(Ok(())) => {}
            // a function may exit zero without draining stdin; its exit
            // status has already been judged above
            Ok(Err(source)) if source.kind() == std::io::ErrorKind::BrokenPipe => {}
            Ok(Err(source)) => return Err(stdio_err(source)),
            Err(_) => {
                return Err(stdio_err(std::io::Error::new(
                    std::io::ErrorKind::Other,
                    "stdin writer thread panicked",
                )))
            }
        }

        decode_documents(&String::from_utf8_lossy(&output.stdout))
    }
}

fn encode_documents(docs: &[Document]) -> Result<String, ExecError> {
    let mut out = String::new();
    for doc in docs {
        if !out.is_empty() {
            out.push_str("---\n");
        }
        out.push_str(&serde_yaml::to_string(doc)?);
    }
    Ok(out)
}

fn decode_documents(raw: &str) -> Result<Vec<Document>, ExecError> {
    // an empty stream would otherwise decode as one null document
    if raw.trim().is_empty() {
        return Ok(Vec::new());
    }
    let mut docs = Vec::new();
    for de in serde_yaml::Deserializer::from_str(raw) {
        docs.push(Document::deserialize(de)?);
    }
    Ok(docs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> Document {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn encode_separates_documents() {
        let payload =
            encode_documents(&[doc("a: 1"), doc("b: 2")]).unwrap();
        assert_eq!(payload, "a: 1\n---\nb: 2\n");
    }

    #[test]
    fn decode_reads_multi_document_stream() {
        let docs = decode_documents("a: 1\n---\nb: 2\n").unwrap();
        assert_eq!(docs, vec![doc("a: 1"), doc("b: 2")]);
    }

    #[test]
    fn decode_of_empty_stream_is_empty() {
        assert!(decode_documents("").unwrap().is_empty());
        assert!(decode_documents("\n  \n").unwrap().is_empty());
    }

    #[test]
    fn engine_exec_round_trips_through_cat() {
        let dir = tempfile::tempdir().unwrap();
        let invocation = BuiltInvocation {
            path: "cat".to_string(),
            args: vec![],
            working_dir: dir.path().to_path_buf(),
        };
        let input = vec![doc("kind: ConfigMap\nname: a"), doc("kind: Service")];
        let output = EngineExec.run(&invocation, input.clone()).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn engine_exec_streams_documents_larger_than_the_pipe_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let invocation = BuiltInvocation {
            path: "cat".to_string(),
            args: vec![],
            working_dir: dir.path().to_path_buf(),
        };
        // well past the ~64 KB pipe buffer in both directions
        let input = vec![doc(&format!("data: {}", "x".repeat(512 * 1024)))];
        let output = EngineExec.run(&invocation, input.clone()).unwrap();
        assert_eq!(output, input);
    }

    #[test]
    fn engine_exec_tolerates_a_child_that_ignores_stdin() {
        let invocation = BuiltInvocation {
            path: "sh".to_string(),
            args: vec!["-c".to_string(), "echo 'ok: true'".to_string()],
            working_dir: std::env::temp_dir(),
        };
        let input = vec![doc(&format!("data: {}", "x".repeat(512 * 1024)))];
        let output = EngineExec.run(&invocation, input).unwrap();
        assert_eq!(output, vec![doc("ok: true")]);
    }

    #[test]
    fn engine_exec_reports_nonzero_exit_with_stderr() {
        let invocation = BuiltInvocation {
            path: "sh".to_string(),
            args: vec![
                "-c".to_string(),
                "echo boom >&2; exit 3".to_string(),
            ],
            working_dir: std::env::temp_dir(),
        };
        let err = EngineExec.run(&invocation, vec![]).unwrap_err();
        match err {
            ExecError::NonZeroExit { status, stderr, .. } => {
                assert_eq!(status.code(), Some(3));
                assert!(stderr.contains("boom"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn engine_exec_reports_spawn_failure() {
        let invocation = BuiltInvocation {
            path: "definitely-not-a-real-binary".to_string(),
            args: vec![],
            working_dir: std::env::temp_dir(),
        };
        assert!(matches!(
            EngineExec.run(&invocation, vec![]),
            Err(ExecError::Spawn { .. })
        ));
    }
}

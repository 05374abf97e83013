//! Downstream agent dispatch
//!
//! Requests reach a single worker task over an mpsc queue and get their
//! answer back on a oneshot channel. The worker runs at most
//! `max_concurrent` agent processes at once. Each process receives the
//! payload on stdin and is killed if it outlives the dispatch timeout,
//! which starts when the job is dequeued and also covers waiting for a
//! free slot.

use crate::config::{AgentsConfig, DownstreamAgentConfig};
use crate::error::{Error, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio::time::Instant;

const QUEUE_DEPTH: usize = 64;

/// Captured result of one agent run
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DispatchOutput {
    pub stdout: String,
    pub stderr: String,
    /// None when the process was terminated by a signal
    pub exit_code: Option<i32>,
}

struct DispatchJob {
    agent: DownstreamAgentConfig,
    source: String,
    payload: String,
    reply: oneshot::Sender<Result<DispatchOutput>>,
}

/// Handle to the dispatch worker
#[derive(Clone)]
pub struct AgentDispatcher {
    agents: Arc<HashMap<String, DownstreamAgentConfig>>,
    jobs: mpsc::Sender<DispatchJob>,
}

impl AgentDispatcher {
    /// Start the worker. Must be called inside a tokio runtime.
    pub fn spawn(config: &AgentsConfig) -> Self {
        Self::with_limits(
            &config.downstream,
            config.max_concurrent,
            Duration::from_secs(config.dispatch_timeout_secs),
        )
    }

    pub fn with_limits(
        downstream: &[DownstreamAgentConfig],
        max_concurrent: usize,
        limit: Duration,
    ) -> Self {
        let agents: HashMap<String, DownstreamAgentConfig> = downstream
            .iter()
            .map(|a| (a.name.clone(), a.clone()))
            .collect();

        let (jobs, rx) = mpsc::channel(QUEUE_DEPTH);
        let permits = Arc::new(Semaphore::new(max_concurrent.max(1)));
        tokio::spawn(run_worker(rx, permits, limit));

        tracing::info!(
            agents = agents.len(),
            max_concurrent = max_concurrent,
            timeout_ms = limit.as_millis() as u64,
            "Agent dispatcher started"
        );

        Self {
            agents: Arc::new(agents),
            jobs,
        }
    }

    pub fn has_agent(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    pub fn agent_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.agents.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run `target` with `payload` on stdin and wait for it to finish
    pub async fn dispatch(&self, source: &str, target: &str, payload: &str) -> Result<DispatchOutput> {
        let agent = self
            .agents
            .get(target)
            .cloned()
            .ok_or_else(|| Error::UnknownAgent(target.to_string()))?;

        let (reply, rx) = oneshot::channel();
        self.jobs
            .send(DispatchJob {
                agent,
                source: source.to_string(),
                payload: payload.to_string(),
                reply,
            })
            .await
            .map_err(|_| Error::Internal("agent dispatcher stopped".to_string()))?;

        rx.await
            .map_err(|_| Error::Internal("agent dispatcher dropped the job".to_string()))?
    }
}

async fn run_worker(
    mut rx: mpsc::Receiver<DispatchJob>,
    permits: Arc<Semaphore>,
    limit: Duration,
) {
    while let Some(job) = rx.recv().await {
        // The deadline covers queueing for a permit as well as the run
        let deadline = Instant::now() + limit;
        let permits = permits.clone();
        tokio::spawn(async move {
            let run = run_with_permit(&permits, &job.agent, &job.source, &job.payload);

            // Dropping the run on timeout drops the child, which kills it
            let result = match tokio::time::timeout_at(deadline, run).await {
                Ok(result) => result,
                Err(_) => {
                    tracing::warn!(
                        agent = %job.agent.name,
                        timeout_ms = limit.as_millis() as u64,
                        "Downstream agent timed out, killed"
                    );
                    Err(Error::UpstreamTimeout(format!(
                        "agent '{}' exceeded {:?}",
                        job.agent.name, limit
                    )))
                }
            };

            if job.reply.send(result).is_err() {
                tracing::debug!(agent = %job.agent.name, "Dispatch caller went away");
            }
        });
    }
    tracing::debug!("Agent dispatcher stopped");
}

async fn run_with_permit(
    permits: &Arc<Semaphore>,
    agent: &DownstreamAgentConfig,
    source: &str,
    payload: &str,
) -> Result<DispatchOutput> {
    let _permit = permits
        .clone()
        .acquire_owned()
        .await
        .map_err(|_| Error::Internal("agent dispatcher closed".to_string()))?;
    run_agent(agent, source, payload).await
}

async fn run_agent(
    agent: &DownstreamAgentConfig,
    source: &str,
    payload: &str,
) -> Result<DispatchOutput> {
    tracing::info!(agent = %agent.name, source = source, "Dispatching to downstream agent");

    let mut child = Command::new(&agent.command)
        .args(&agent.args)
        .env("OPENSEC_SOURCE_AGENT", source)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| {
            Error::Upstream(format!(
                "Failed to spawn agent '{}' ({}): {}",
                agent.name, agent.command, e
            ))
        })?;

    let stdin = child.stdin.take();
    let feed = async move {
        if let Some(mut stdin) = stdin {
            if let Err(e) = stdin.write_all(payload.as_bytes()).await {
                tracing::debug!(agent = %agent.name, error = %e, "Agent did not read its payload");
            }
            // stdin is dropped here so the child sees EOF
        }
    };

    // Feed stdin while draining stdout/stderr so neither side fills its pipe
    let ((), output) = tokio::join!(feed, child.wait_with_output());
    let output = output
        .map_err(|e| Error::Upstream(format!("Agent '{}' failed: {}", agent.name, e)))?;

    let result = DispatchOutput {
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        exit_code: output.status.code(),
    };
    tracing::info!(agent = %agent.name, exit_code = ?result.exit_code, "Downstream agent finished");
    Ok(result)
}

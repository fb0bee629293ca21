use super::state::{SessionSnapshot, SessionState};
use crate::{
    error::SoilwatchError,
    feed::FeedSource,
    ingestor::CycleOutcome,
    views::TableRow,
    window::ChartData,
};
use log::{debug, error, info};
use soilwatch_schemas::{feed::RawFeedEntry, reading::MetricGroup};
use std::{future::Future, path::PathBuf, pin::Pin, sync::Arc, time::Duration};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
    time::{self, error::Elapsed, MissedTickBehavior},
};

const COMMAND_QUEUE_DEPTH: usize = 32;

type Reply<T> = oneshot::Sender<T>;

type Fetched = Result<Result<Vec<RawFeedEntry>, SoilwatchError>, Elapsed>;

/// A fetch under its cycle budget, owned by the engine loop while it runs.
type PendingFetch = Pin<Box<dyn Future<Output = Fetched> + Send>>;

/// Requests from the presentation layer, serialized onto the engine task.
#[derive(Debug)]
pub enum SessionCommand {
    Older(Reply<bool>),
    Newer(Reply<bool>),
    ToggleChart(MetricGroup, Reply<bool>),
    Table(MetricGroup, Reply<Vec<TableRow>>),
    Chart(MetricGroup, Reply<Result<ChartData, SoilwatchError>>),
    VisibleCharts(Reply<Result<Vec<ChartData>, SoilwatchError>>),
    Snapshot(Reply<SessionSnapshot>),
    Export {
        dir: PathBuf,
        file_name: String,
        reply: Reply<Result<(PathBuf, usize), SoilwatchError>>,
    },
}

/// Drives the poll cycle and serves commands for one session.
pub struct SessionEngine<F: FeedSource> {
    pub(super) state: SessionState,
    pub(super) feed: Arc<F>,
    pub(super) poll_interval: Duration,
    pub(super) fetch_timeout: Duration,
}

impl<F: FeedSource> SessionEngine<F> {
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Runs one poll cycle: fetch under the cycle budget, then absorb.
    ///
    /// Failures are counted and returned; the cursor only moves past absorbed entries.
    pub async fn poll_once(&mut self) -> Result<CycleOutcome, SoilwatchError> {
        let fetched = time::timeout(self.fetch_timeout, self.feed.fetch()).await;
        self.settle(fetched)
    }

    fn start_fetch(&self) -> PendingFetch {
        let feed = Arc::clone(&self.feed);
        Box::pin(time::timeout(self.fetch_timeout, async move { feed.fetch().await }))
    }

    fn settle(&mut self, fetched: Fetched) -> Result<CycleOutcome, SoilwatchError> {
        let e = match fetched {
            Ok(Ok(snapshot)) => return self.state.ingest(&snapshot),
            Ok(Err(e)) => e,
            Err(_) => SoilwatchError::FetchTimeout(self.fetch_timeout),
        };
        self.state.ingestor.record_fetch_failure(&e);
        Err(e)
    }

    /// Starts the periodic poll on the current tokio runtime.
    ///
    /// The first cycle runs immediately; later cycles follow `poll_interval`. The task lives
    /// until `SessionHandle::stop` is called or the handle is dropped.
    pub fn spawn(self) -> SessionHandle {
        let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE_DEPTH);
        let (shutdown, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(command_rx, shutdown_rx));
        SessionHandle {
            commands,
            shutdown: Some(shutdown),
            task: Some(task),
        }
    }

    async fn run(
        mut self,
        mut commands: mpsc::Receiver<SessionCommand>,
        mut shutdown: oneshot::Receiver<()>,
    ) -> SessionState {
        let mut ticker = time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut in_flight: Option<PendingFetch> = None;
        info!(
            "Session started: polling every {:?}, cycle budget {:?}",
            self.poll_interval, self.fetch_timeout
        );

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => break,
                fetched = wait_for(&mut in_flight), if in_flight.is_some() => {
                    in_flight = None;
                    if let Err(e) = self.settle(fetched) {
                        if !e.is_transient() {
                            error!("Poll cycle hit a non-recoverable error: {}", e);
                        }
                    }
                }
                Some(command) = commands.recv() => self.handle(command),
                // At most one fetch is in flight; ticks missed meanwhile are delayed.
                _ = ticker.tick(), if in_flight.is_none() => {
                    in_flight = Some(self.start_fetch());
                }
            }
        }

        info!(
            "Session stopped with {} record(s) in the log",
            self.state.log().len()
        );
        self.state
    }

    fn handle(&mut self, command: SessionCommand) {
        debug!("Handling {:?}", command);
        let state = &mut self.state;
        // A dropped reply receiver only means the caller stopped waiting.
        match command {
            SessionCommand::Older(reply) => {
                let _ = reply.send(state.older());
            }
            SessionCommand::Newer(reply) => {
                let _ = reply.send(state.newer());
            }
            SessionCommand::ToggleChart(group, reply) => {
                let _ = reply.send(state.toggle_chart(group));
            }
            SessionCommand::Table(group, reply) => {
                let _ = reply.send(state.table(group));
            }
            SessionCommand::Chart(group, reply) => {
                let _ = reply.send(state.chart(group));
            }
            SessionCommand::VisibleCharts(reply) => {
                let _ = reply.send(state.visible_charts());
            }
            SessionCommand::Snapshot(reply) => {
                let _ = reply.send(state.snapshot());
            }
            SessionCommand::Export { dir, file_name, reply } => {
                let _ = reply.send(state.export(&dir, &file_name));
            }
        }
    }
}

async fn wait_for(pending: &mut Option<PendingFetch>) -> Fetched {
    match pending.as_mut() {
        Some(fetch) => fetch.await,
        None => std::future::pending().await,
    }
}

/// Client side of a running session.
///
/// Dropping the handle cancels the poll task just like `stop`, but discards the state.
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<SessionState>>,
}

impl SessionHandle {
    async fn request<T>(
        &self,
        make: impl FnOnce(Reply<T>) -> SessionCommand,
    ) -> Result<T, SoilwatchError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(make(reply))
            .await
            .map_err(|_| SoilwatchError::SessionClosed)?;
        response.await.map_err(|_| SoilwatchError::SessionClosed)
    }

    pub async fn older(&self) -> Result<bool, SoilwatchError> {
        self.request(SessionCommand::Older).await
    }

    pub async fn newer(&self) -> Result<bool, SoilwatchError> {
        self.request(SessionCommand::Newer).await
    }

    pub async fn toggle_chart(&self, group: MetricGroup) -> Result<bool, SoilwatchError> {
        self.request(|reply| SessionCommand::ToggleChart(group, reply)).await
    }

    pub async fn table(&self, group: MetricGroup) -> Result<Vec<TableRow>, SoilwatchError> {
        self.request(|reply| SessionCommand::Table(group, reply)).await
    }

    pub async fn chart(&self, group: MetricGroup) -> Result<ChartData, SoilwatchError> {
        self.request(|reply| SessionCommand::Chart(group, reply)).await?
    }

    pub async fn visible_charts(&self) -> Result<Vec<ChartData>, SoilwatchError> {
        self.request(SessionCommand::VisibleCharts).await?
    }

    pub async fn snapshot(&self) -> Result<SessionSnapshot, SoilwatchError> {
        self.request(SessionCommand::Snapshot).await
    }

    pub async fn export(
        &self,
        dir: impl Into<PathBuf>,
        file_name: impl Into<String>,
    ) -> Result<(PathBuf, usize), SoilwatchError> {
        let dir = dir.into();
        let file_name = file_name.into();
        self.request(|reply| SessionCommand::Export { dir, file_name, reply })
            .await?
    }

    /// Cancels the poll trigger and hands back the final state. No cycle runs afterwards.
    pub async fn stop(mut self) -> Result<SessionState, SoilwatchError> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        match self.task.take() {
            Some(task) => task.await.map_err(|_| SoilwatchError::SessionClosed),
            None => Err(SoilwatchError::SessionClosed),
        }
    }
}

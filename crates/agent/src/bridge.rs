//! Session bridge
//!
//! One bridge per connected client. The bridge is the sole mutator of
//! session state: it decodes client intents into state transitions, feeds
//! the pipeline, mediates tool calls, and emits wire frames through the
//! outbound channel the server pumps into the socket.

use std::sync::{Arc, Weak};

use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use voice_bridge_audio::AudioStreamManager;
use voice_bridge_config::Settings;
use voice_bridge_core::{ConversationPipeline, PipelineEvent, PipelineInput, SessionContext};
use voice_bridge_tools::ToolGateway;
use voice_bridge_transport::{
    codec::{encode_f32_frame, encode_pcm16},
    ClientMessage, OutboundFrame, ServerMessage, ToolStatus, WireState,
};
use voice_bridge_tts::SpeechClient;

use crate::queue::TaskQueue;
use crate::transcript::TranscriptBuffer;
use crate::BridgeError;

/// Session states. `Executing` is wire-visible as `processing`;
/// `Disconnected`, `Connecting`, and `Error` have no wire representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    Connecting,
    Idle,
    Listening,
    Processing,
    Executing,
    Speaking,
    Error,
}

impl SessionState {
    fn wire(self) -> Option<WireState> {
        match self {
            SessionState::Idle => Some(WireState::Idle),
            SessionState::Listening => Some(WireState::Listening),
            SessionState::Processing | SessionState::Executing => Some(WireState::Processing),
            SessionState::Speaking => Some(WireState::Speaking),
            SessionState::Disconnected | SessionState::Connecting | SessionState::Error => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "disconnected",
            SessionState::Connecting => "connecting",
            SessionState::Idle => "idle",
            SessionState::Listening => "listening",
            SessionState::Processing => "processing",
            SessionState::Executing => "executing",
            SessionState::Speaking => "speaking",
            SessionState::Error => "error",
        }
    }
}

/// Recognition-stage conditions that mean "nothing to act on"; logged but
/// never surfaced to the client.
const BENIGN_PIPELINE_ERRORS: &[&str] = &[
    "no speech detected",
    "empty transcript",
    "audio too short",
];

fn is_benign_error(message: &str) -> bool {
    let lower = message.to_lowercase();
    BENIGN_PIPELINE_ERRORS.iter().any(|p| lower.contains(p))
}

/// Bridge tunables
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Rate the client sends audio at (Hz)
    pub input_sample_rate: u32,
    /// Rate the pipeline consumes at (Hz)
    pub pipeline_sample_rate: u32,
    /// Rate of TTS audio sent to the client (Hz)
    pub tts_sample_rate: u32,
    /// Capture queue capacity, in frames
    pub audio_queue_frames: usize,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            input_sample_rate: 48000,
            pipeline_sample_rate: 16000,
            tts_sample_rate: 24000,
            audio_queue_frames: 64,
        }
    }
}

impl BridgeConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            input_sample_rate: settings.audio.input_sample_rate,
            pipeline_sample_rate: settings.audio.pipeline_sample_rate,
            tts_sample_rate: settings.audio.tts_sample_rate,
            audio_queue_frames: settings.audio.queue_frames,
        }
    }
}

struct Inner {
    state: SessionState,
    transcript: TranscriptBuffer,
    audio: Option<Arc<AudioStreamManager>>,
    capture_task: Option<JoinHandle<()>>,
    /// Generation handed to the next interaction
    next_generation: u64,
    /// Interactions below this generation are cancelled; their remaining
    /// output is discarded rather than forwarded
    cancel_floor: u64,
    /// Whether the current interaction has produced pipeline audio
    emitted_audio: bool,
}

/// Per-connection orchestrator
pub struct SessionBridge {
    ctx: SessionContext,
    config: BridgeConfig,
    pipeline: Arc<dyn ConversationPipeline>,
    gateway: Arc<ToolGateway>,
    /// Used to speak final responses when the pipeline yields no audio
    synthesizer: Option<Arc<SpeechClient>>,
    out: mpsc::UnboundedSender<OutboundFrame>,
    queue: TaskQueue,
    /// Self-handle for the tasks the bridge spawns
    weak: Weak<SessionBridge>,
    inner: Mutex<Inner>,
}

impl SessionBridge {
    /// Create a bridge and the outbound frame receiver the transport pumps
    pub fn new(
        ctx: SessionContext,
        config: BridgeConfig,
        pipeline: Arc<dyn ConversationPipeline>,
        gateway: Arc<ToolGateway>,
        synthesizer: Option<Arc<SpeechClient>>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<OutboundFrame>) {
        let (out, rx) = mpsc::unbounded_channel();
        let queue = TaskQueue::new(format!("text-tasks:{}", ctx.session_id));

        let bridge = Arc::new_cyclic(|weak| Self {
            ctx,
            config,
            pipeline,
            gateway,
            synthesizer,
            out,
            queue,
            weak: weak.clone(),
            inner: Mutex::new(Inner {
                state: SessionState::Disconnected,
                transcript: TranscriptBuffer::new(),
                audio: None,
                capture_task: None,
                next_generation: 0,
                cancel_floor: 0,
                emitted_audio: false,
            }),
        });

        (bridge, rx)
    }

    /// Session identifier
    pub fn session_id(&self) -> &str {
        &self.ctx.session_id
    }

    /// Session identity
    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    /// Initialize the pipeline session and announce readiness.
    ///
    /// Emits the initial status message and the sample-rate configuration.
    pub async fn connect(&self) -> Result<(), BridgeError> {
        self.set_state(SessionState::Connecting);

        self.pipeline
            .open_session(&self.ctx)
            .await
            .map_err(|e| BridgeError::Pipeline(e.to_string()))?;

        self.set_state(SessionState::Idle);
        self.send(ServerMessage::Config {
            tts_sample_rate: self.config.tts_sample_rate,
            input_sample_rate: self.config.input_sample_rate,
        });

        tracing::info!(session = %self.ctx.session_id, user = %self.ctx.user_id, "Session connected");
        Ok(())
    }

    /// Dispatch one decoded client message
    pub async fn handle_message(&self, message: ClientMessage) {
        match message {
            ClientMessage::Start => self.start_capture().await,
            ClientMessage::Stop => self.stop_capture(),
            ClientMessage::BargeIn => self.barge_in().await,
            ClientMessage::Text { text } => self.submit_text(text),
        }
    }

    /// Accept one inbound binary audio frame at the client's native rate.
    /// Frames outside the listening state are dropped.
    pub async fn push_audio(&self, samples: Vec<i16>) {
        let manager = {
            let inner = self.inner.lock();
            if inner.state != SessionState::Listening {
                return;
            }
            inner.audio.clone()
        };

        if let Some(manager) = manager {
            if let Err(e) = manager
                .push_chunk(&samples, self.config.input_sample_rate)
                .await
            {
                tracing::warn!(error = %e, "Dropped inbound audio chunk");
            }
        }
    }

    /// `idle → listening`: open a capture and start the audio-path run
    async fn start_capture(&self) {
        let (manager, generation) = {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::Disconnected {
                return;
            }
            if inner.audio.is_some() {
                drop(inner);
                // Protocol violation per the session invariant, not a
                // malformed message; surfaced rather than dropped.
                self.send(ServerMessage::Error {
                    message: "Capture already in progress".to_string(),
                });
                return;
            }

            inner.transcript.clear();
            inner.emitted_audio = false;
            let generation = inner.next_generation;
            inner.next_generation += 1;

            let manager = Arc::new(AudioStreamManager::new(
                self.config.pipeline_sample_rate,
                self.config.audio_queue_frames,
            ));
            inner.audio = Some(manager.clone());
            (manager, generation)
        };

        let stream = match manager.create_stream() {
            Ok(stream) => stream,
            Err(e) => {
                tracing::error!(error = %e, "Failed to open capture stream");
                self.inner.lock().audio = None;
                return;
            }
        };

        self.set_state(SessionState::Listening);

        let Some(bridge) = self.weak.upgrade() else {
            return;
        };
        let handle = tokio::spawn(async move {
            bridge
                .run_interaction(generation, PipelineInput::Audio(stream))
                .await;
        });
        self.inner.lock().capture_task = Some(handle);
    }

    /// `listening → processing`: no more input; the run drains what is
    /// buffered and completes on its own
    fn stop_capture(&self) {
        let manager = {
            let inner = self.inner.lock();
            if inner.state != SessionState::Listening {
                tracing::debug!("Ignoring stop outside listening state");
                return;
            }
            inner.audio.clone()
        };

        let Some(manager) = manager else { return };
        self.set_state(SessionState::Processing);
        manager.end();
    }

    /// Enqueue a text interaction behind any already pending
    pub fn submit_text(&self, text: String) {
        let Some(bridge) = self.weak.upgrade() else {
            return;
        };
        let enqueued = self.queue.enqueue(async move {
            bridge.run_text_interaction(text).await;
        });
        if enqueued.is_err() {
            tracing::warn!(session = %self.ctx.session_id, "Text task dropped; queue closed");
        }
    }

    async fn run_text_interaction(&self, text: String) {
        let generation = {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::Disconnected {
                return;
            }
            inner.transcript.clear();
            inner.emitted_audio = false;
            let generation = inner.next_generation;
            inner.next_generation += 1;
            generation
        };

        self.set_state(SessionState::Processing);
        // The query itself is the final recognition on the text path
        self.send(ServerMessage::AsrFinal { text: text.clone() });

        self.run_interaction(generation, PipelineInput::Text { text })
            .await;
    }

    /// Drive one pipeline run to completion, translating its events
    async fn run_interaction(&self, generation: u64, input: PipelineInput) {
        let was_audio = matches!(input, PipelineInput::Audio(_));

        let mut events = match self.pipeline.run(&self.ctx, input).await {
            Ok(events) => events,
            Err(e) => {
                self.surface_failure(&e.to_string());
                self.finish_interaction(generation, was_audio, true).await;
                return;
            }
        };

        let mut failed = false;
        while let Some(event) = events.next().await {
            if self.is_cancelled(generation) {
                tracing::debug!(
                    session = %self.ctx.session_id,
                    kind = event.kind(),
                    "Discarding pipeline output after cancellation"
                );
                return;
            }
            if self.handle_event(event).await.is_err() {
                failed = true;
                break;
            }
        }

        if self.is_cancelled(generation) {
            return;
        }
        self.finish_interaction(generation, was_audio, failed).await;
    }

    /// Translate one pipeline event. `Err(())` means the interaction is
    /// over and its failure has been surfaced.
    async fn handle_event(&self, event: PipelineEvent) -> Result<(), ()> {
        match event {
            PipelineEvent::AsrPartial { text } => {
                self.send(ServerMessage::AsrPartial { text });
            }
            PipelineEvent::AsrFinal { text } => {
                self.send(ServerMessage::AsrFinal { text });
            }
            PipelineEvent::TextDelta { text } => {
                let cumulative = {
                    let mut inner = self.inner.lock();
                    inner.transcript.push(&text);
                    inner.transcript.text().to_string()
                };
                self.send(ServerMessage::AgentTextPartial { text: cumulative });
            }
            PipelineEvent::TextFinal { text } => {
                self.inner.lock().transcript.replace(text);
            }
            PipelineEvent::Audio { samples, .. } => {
                self.inner.lock().emitted_audio = true;
                self.set_state(SessionState::Speaking);
                // One wire frame per pipeline chunk; no batching
                self.send_frame(OutboundFrame::Audio(encode_f32_frame(&samples)));
            }
            PipelineEvent::ToolCall(call) => {
                self.set_state(SessionState::Executing);
                self.send(ServerMessage::Tool {
                    name: call.name.clone(),
                    status: ToolStatus::Started,
                });

                // Blocking point: the run resumes only after the result
                // is merged back
                let result = self.gateway.execute(&call, &self.ctx).await;
                let status = if result.ok {
                    ToolStatus::Succeeded
                } else {
                    ToolStatus::Failed
                };

                if let Some(effect) = result.ui.clone() {
                    self.send(ServerMessage::UiEffect { effect });
                }
                self.send(ServerMessage::Tool {
                    name: call.name,
                    status,
                });

                if let Err(e) = self.pipeline.push_tool_result(&self.ctx, result).await {
                    self.surface_failure(&e.to_string());
                    return Err(());
                }
                self.set_state(SessionState::Processing);
            }
            PipelineEvent::StateSync { key, value } => {
                self.send(ServerMessage::Sync { key, value });
            }
            PipelineEvent::Error { message } => {
                if is_benign_error(&message) {
                    tracing::debug!(message = %message, "Benign pipeline condition; not surfaced");
                } else {
                    self.surface_failure(&message);
                    return Err(());
                }
            }
        }
        Ok(())
    }

    /// Flush the transcript, speak it if nothing else did, return to idle
    async fn finish_interaction(&self, generation: u64, was_audio: bool, failed: bool) {
        let (final_text, emitted_audio) = {
            let mut inner = self.inner.lock();
            if was_audio {
                inner.audio = None;
                inner.capture_task = None;
            }
            let text = if failed {
                inner.transcript.clear();
                String::new()
            } else {
                inner.transcript.take()
            };
            (text, inner.emitted_audio)
        };

        if !final_text.is_empty() {
            self.send(ServerMessage::AgentTextFinal {
                text: final_text.clone(),
            });
            if !emitted_audio {
                self.speak_directly(generation, &final_text).await;
            }
        }

        if !self.is_cancelled(generation) {
            self.set_state(SessionState::Idle);
        }
    }

    /// Synthesize the final response through the speech client when the
    /// pipeline produced no audio of its own
    async fn speak_directly(&self, generation: u64, text: &str) {
        let Some(client) = self.synthesizer.clone() else {
            return;
        };

        let mut chunks = client.synthesize_stream(text);
        while let Some(chunk) = chunks.next().await {
            if self.is_cancelled(generation) {
                return;
            }
            match chunk {
                Ok(samples) => {
                    self.set_state(SessionState::Speaking);
                    self.send_frame(OutboundFrame::Audio(encode_pcm16(&samples)));
                }
                Err(e) => {
                    // Terminal synthesis failures rank with pipeline errors
                    self.surface_failure(&e.to_string());
                    return;
                }
            }
        }
    }

    /// Interrupt the in-progress response: truncate the transcript, end
    /// the audio sequence, discard whatever the pipeline still emits
    pub async fn barge_in(&self) {
        let (manager, task) = {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::Disconnected {
                return;
            }
            inner.cancel_floor = inner.next_generation;
            inner.transcript.clear();
            inner.emitted_audio = false;
            (inner.audio.take(), inner.capture_task.take())
        };

        if let Some(manager) = manager {
            manager.end();
        }
        // Detach rather than abort: the run observes cancellation on its
        // next event and exits; late output is discarded either way
        drop(task);

        self.set_state(SessionState::Idle);

        if let Err(e) = self.pipeline.interrupt(&self.ctx).await {
            tracing::warn!(error = %e, "Pipeline interrupt failed");
        }
        tracing::info!(session = %self.ctx.session_id, "Barge-in");
    }

    /// `* → disconnected`: terminate the capture, close the pipeline
    /// session. The caller removes the registry entry.
    pub async fn cleanup(&self) {
        let (manager, task) = {
            let mut inner = self.inner.lock();
            if inner.state == SessionState::Disconnected {
                return;
            }
            inner.state = SessionState::Disconnected;
            inner.cancel_floor = inner.next_generation;
            inner.transcript.clear();
            (inner.audio.take(), inner.capture_task.take())
        };

        if let Some(manager) = manager {
            manager.end();
        }
        if let Some(task) = task {
            task.abort();
            let _ = task.await;
        }

        if let Err(e) = self.pipeline.close_session(&self.ctx).await {
            tracing::warn!(error = %e, "Pipeline session close failed");
        }
        tracing::info!(session = %self.ctx.session_id, "Session cleaned up");
    }

    fn is_cancelled(&self, generation: u64) -> bool {
        let inner = self.inner.lock();
        generation < inner.cancel_floor || inner.state == SessionState::Disconnected
    }

    fn surface_failure(&self, message: &str) {
        tracing::error!(
            session = %self.ctx.session_id,
            error = %message,
            "Interaction failed"
        );
        self.set_state(SessionState::Error);
        self.send(ServerMessage::Error {
            message: message.to_string(),
        });
    }

    /// Record the new state, emitting a wire message only when the
    /// wire-visible state actually changes
    fn set_state(&self, new_state: SessionState) {
        let announce = {
            let mut inner = self.inner.lock();
            let old_wire = inner.state.wire();
            inner.state = new_state;
            let new_wire = new_state.wire();
            if old_wire != new_wire {
                new_wire
            } else {
                None
            }
        };

        if let Some(state) = announce {
            self.send(ServerMessage::State { state });
        }
    }

    fn send(&self, message: ServerMessage) {
        self.send_frame(OutboundFrame::Control(message));
    }

    fn send_frame(&self, frame: OutboundFrame) {
        if self.out.send(frame).is_err() {
            tracing::debug!("Outbound channel closed; dropping frame");
        }
    }
}

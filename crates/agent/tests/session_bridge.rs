//! Integration tests for the session bridge against scripted pipelines

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_stream::wrappers::UnboundedReceiverStream;

use voice_bridge_agent::{BridgeConfig, SessionBridge, SessionState};
use voice_bridge_core::{
    AudioFrame, ConversationPipeline, EventStream, PipelineEvent, PipelineInput,
    Result as CoreResult, Role, SessionContext, ToolCall, ToolResult,
};
use voice_bridge_tools::{create_document_gateway, InMemoryDocumentStore, ToolGateway};
use voice_bridge_transport::{ClientMessage, OutboundFrame, ServerMessage, ToolStatus, WireState};

/// Pipeline that replays a scripted event batch per run and records what
/// flows back into it
#[derive(Default)]
struct ScriptedPipeline {
    runs: Mutex<VecDeque<Vec<PipelineEvent>>>,
    tool_results: Mutex<Vec<ToolResult>>,
    audio_frames: Arc<Mutex<Vec<AudioFrame>>>,
    interrupts: Mutex<usize>,
}

impl ScriptedPipeline {
    fn with_runs(runs: Vec<Vec<PipelineEvent>>) -> Arc<Self> {
        Arc::new(Self {
            runs: Mutex::new(runs.into()),
            ..Default::default()
        })
    }

    fn tool_results(&self) -> Vec<ToolResult> {
        self.tool_results.lock().clone()
    }

    fn captured_frames(&self) -> Vec<AudioFrame> {
        self.audio_frames.lock().clone()
    }
}

#[async_trait]
impl ConversationPipeline for ScriptedPipeline {
    async fn open_session(&self, _ctx: &SessionContext) -> CoreResult<()> {
        Ok(())
    }

    async fn run(&self, _ctx: &SessionContext, input: PipelineInput) -> CoreResult<EventStream> {
        let events = self.runs.lock().pop_front().unwrap_or_default();
        match input {
            PipelineInput::Audio(mut audio) => {
                let sink = self.audio_frames.clone();
                Ok(Box::pin(async_stream::stream! {
                    // Consume the capture the way an STT stage would
                    while let Some(frame) = audio.next().await {
                        sink.lock().push(frame);
                    }
                    for event in events {
                        yield event;
                    }
                }))
            }
            PipelineInput::Text { .. } => Ok(Box::pin(futures::stream::iter(events))),
        }
    }

    async fn push_tool_result(&self, _ctx: &SessionContext, result: ToolResult) -> CoreResult<()> {
        self.tool_results.lock().push(result);
        Ok(())
    }

    async fn interrupt(&self, _ctx: &SessionContext) -> CoreResult<()> {
        *self.interrupts.lock() += 1;
        Ok(())
    }

    async fn close_session(&self, _ctx: &SessionContext) -> CoreResult<()> {
        Ok(())
    }
}

/// Pipeline whose event stream is driven by the test through a channel
#[derive(Default)]
struct ChannelPipeline {
    senders: Mutex<Vec<mpsc::UnboundedSender<PipelineEvent>>>,
    interrupts: Mutex<usize>,
}

impl ChannelPipeline {
    fn interrupt_count(&self) -> usize {
        *self.interrupts.lock()
    }

    async fn wait_sender(&self) -> mpsc::UnboundedSender<PipelineEvent> {
        for _ in 0..200 {
            if let Some(tx) = self.senders.lock().last().cloned() {
                return tx;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("pipeline run never started");
    }
}

#[async_trait]
impl ConversationPipeline for ChannelPipeline {
    async fn open_session(&self, _ctx: &SessionContext) -> CoreResult<()> {
        Ok(())
    }

    async fn run(&self, _ctx: &SessionContext, input: PipelineInput) -> CoreResult<EventStream> {
        if let PipelineInput::Audio(mut audio) = input {
            tokio::spawn(async move { while audio.next().await.is_some() {} });
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().push(tx);
        Ok(Box::pin(UnboundedReceiverStream::new(rx)))
    }

    async fn push_tool_result(&self, _ctx: &SessionContext, _result: ToolResult) -> CoreResult<()> {
        Ok(())
    }

    async fn interrupt(&self, _ctx: &SessionContext) -> CoreResult<()> {
        *self.interrupts.lock() += 1;
        Ok(())
    }

    async fn close_session(&self, _ctx: &SessionContext) -> CoreResult<()> {
        Ok(())
    }
}

fn member_ctx() -> SessionContext {
    SessionContext::new("s-test", "u1", Role::Member)
}

fn empty_gateway() -> Arc<ToolGateway> {
    Arc::new(ToolGateway::new())
}

async fn next_frame(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> OutboundFrame {
    timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for outbound frame")
        .expect("outbound channel closed")
}

async fn expect_message(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>, expected: ServerMessage) {
    match next_frame(rx).await {
        OutboundFrame::Control(msg) => assert_eq!(msg, expected),
        OutboundFrame::Audio(_) => panic!("expected {:?}, got audio frame", expected),
    }
}

async fn expect_state(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>, state: WireState) {
    expect_message(rx, ServerMessage::State { state }).await;
}

async fn expect_audio(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) -> usize {
    match next_frame(rx).await {
        OutboundFrame::Audio(bytes) => bytes.len(),
        OutboundFrame::Control(msg) => panic!("expected audio frame, got {:?}", msg),
    }
}

async fn expect_silence(rx: &mut mpsc::UnboundedReceiver<OutboundFrame>) {
    if let Ok(Some(frame)) = timeout(Duration::from_millis(150), rx.recv()).await {
        panic!("expected no further frames, got {:?}", frame);
    }
}

/// Connect and consume the initial status + config messages
async fn connected(
    pipeline: Arc<dyn ConversationPipeline>,
    gateway: Arc<ToolGateway>,
) -> (Arc<SessionBridge>, mpsc::UnboundedReceiver<OutboundFrame>) {
    let (bridge, mut rx) = SessionBridge::new(
        member_ctx(),
        BridgeConfig::default(),
        pipeline,
        gateway,
        None,
    );
    bridge.connect().await.unwrap();
    expect_state(&mut rx, WireState::Idle).await;
    match next_frame(&mut rx).await {
        OutboundFrame::Control(ServerMessage::Config {
            input_sample_rate, ..
        }) => assert_eq!(input_sample_rate, 48000),
        other => panic!("expected config message, got {:?}", other),
    }
    (bridge, rx)
}

#[tokio::test]
async fn test_start_stop_without_audio_never_speaks() {
    let pipeline = ScriptedPipeline::with_runs(vec![vec![]]);
    let (bridge, mut rx) = connected(pipeline, empty_gateway()).await;

    bridge.handle_message(ClientMessage::Start).await;
    expect_state(&mut rx, WireState::Listening).await;

    bridge.handle_message(ClientMessage::Stop).await;
    expect_state(&mut rx, WireState::Processing).await;

    // The run drains nothing and completes; never enters speaking
    expect_state(&mut rx, WireState::Idle).await;
    expect_silence(&mut rx).await;
    assert_eq!(bridge.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_text_query_message_sequence() {
    let pipeline = ScriptedPipeline::with_runs(vec![vec![
        PipelineEvent::TextDelta {
            text: "The SLA is".into(),
        },
        PipelineEvent::TextDelta {
            text: " 99.9%.".into(),
        },
    ]]);
    let (bridge, mut rx) = connected(pipeline, empty_gateway()).await;

    bridge
        .handle_message(ClientMessage::Text {
            text: "What is the SLA?".into(),
        })
        .await;

    expect_state(&mut rx, WireState::Processing).await;
    expect_message(
        &mut rx,
        ServerMessage::AsrFinal {
            text: "What is the SLA?".into(),
        },
    )
    .await;
    expect_message(
        &mut rx,
        ServerMessage::AgentTextPartial {
            text: "The SLA is".into(),
        },
    )
    .await;
    expect_message(
        &mut rx,
        ServerMessage::AgentTextPartial {
            text: "The SLA is 99.9%.".into(),
        },
    )
    .await;
    expect_message(
        &mut rx,
        ServerMessage::AgentTextFinal {
            text: "The SLA is 99.9%.".into(),
        },
    )
    .await;
    expect_state(&mut rx, WireState::Idle).await;
    expect_silence(&mut rx).await;
}

#[tokio::test]
async fn test_text_queries_execute_in_order() {
    let pipeline = ScriptedPipeline::with_runs(vec![
        vec![PipelineEvent::TextDelta {
            text: "first answer".into(),
        }],
        vec![PipelineEvent::TextDelta {
            text: "second answer".into(),
        }],
    ]);
    let (bridge, mut rx) = connected(pipeline, empty_gateway()).await;

    bridge
        .handle_message(ClientMessage::Text { text: "one".into() })
        .await;
    bridge
        .handle_message(ClientMessage::Text { text: "two".into() })
        .await;

    // First interaction completes fully before the second begins
    expect_state(&mut rx, WireState::Processing).await;
    expect_message(&mut rx, ServerMessage::AsrFinal { text: "one".into() }).await;
    expect_message(
        &mut rx,
        ServerMessage::AgentTextPartial {
            text: "first answer".into(),
        },
    )
    .await;
    expect_message(
        &mut rx,
        ServerMessage::AgentTextFinal {
            text: "first answer".into(),
        },
    )
    .await;
    expect_state(&mut rx, WireState::Idle).await;

    expect_state(&mut rx, WireState::Processing).await;
    expect_message(&mut rx, ServerMessage::AsrFinal { text: "two".into() }).await;
    expect_message(
        &mut rx,
        ServerMessage::AgentTextPartial {
            text: "second answer".into(),
        },
    )
    .await;
    expect_message(
        &mut rx,
        ServerMessage::AgentTextFinal {
            text: "second answer".into(),
        },
    )
    .await;
    expect_state(&mut rx, WireState::Idle).await;
}

#[tokio::test]
async fn test_inbound_audio_is_resampled_for_the_pipeline() {
    let pipeline = ScriptedPipeline::with_runs(vec![vec![]]);
    let (bridge, mut rx) = connected(pipeline.clone(), empty_gateway()).await;

    bridge.handle_message(ClientMessage::Start).await;
    expect_state(&mut rx, WireState::Listening).await;

    // 480 samples at 48 kHz decimate to ceil(480/3) = 160 at 16 kHz
    bridge.push_audio(vec![1i16; 480]).await;
    bridge.handle_message(ClientMessage::Stop).await;
    expect_state(&mut rx, WireState::Processing).await;
    expect_state(&mut rx, WireState::Idle).await;

    let frames = pipeline.captured_frames();
    assert_eq!(frames.len(), 1);
    assert_eq!(frames[0].sample_rate, 16000);
    assert_eq!(frames[0].len(), 160);
}

#[tokio::test]
async fn test_duplicate_start_is_a_protocol_violation() {
    let pipeline = ScriptedPipeline::with_runs(vec![vec![]]);
    let (bridge, mut rx) = connected(pipeline, empty_gateway()).await;

    bridge.handle_message(ClientMessage::Start).await;
    expect_state(&mut rx, WireState::Listening).await;

    bridge.handle_message(ClientMessage::Start).await;
    match next_frame(&mut rx).await {
        OutboundFrame::Control(ServerMessage::Error { message }) => {
            assert!(message.contains("already in progress"));
        }
        other => panic!("expected error message, got {:?}", other),
    }
    // Still capturing; no state change was announced
    assert_eq!(bridge.state(), SessionState::Listening);
}

#[tokio::test]
async fn test_barge_in_suppresses_remaining_audio() {
    let pipeline = Arc::new(ChannelPipeline::default());
    let (bridge, mut rx) = connected(pipeline.clone(), empty_gateway()).await;

    bridge
        .handle_message(ClientMessage::Text {
            text: "read the summary aloud".into(),
        })
        .await;
    expect_state(&mut rx, WireState::Processing).await;
    expect_message(
        &mut rx,
        ServerMessage::AsrFinal {
            text: "read the summary aloud".into(),
        },
    )
    .await;

    let events = pipeline.wait_sender().await;
    events
        .send(PipelineEvent::Audio {
            samples: vec![0.5f32; 160].into(),
            sample_rate: 24000,
        })
        .unwrap();

    expect_state(&mut rx, WireState::Speaking).await;
    assert_eq!(expect_audio(&mut rx).await, 320); // 160 samples, 2 bytes each

    bridge.handle_message(ClientMessage::BargeIn).await;
    expect_state(&mut rx, WireState::Idle).await;
    assert_eq!(pipeline.interrupt_count(), 1);

    // Output already in flight when the user interrupted: discarded
    events
        .send(PipelineEvent::Audio {
            samples: vec![0.5f32; 160].into(),
            sample_rate: 24000,
        })
        .unwrap();
    events
        .send(PipelineEvent::TextDelta {
            text: "too late".into(),
        })
        .unwrap();
    drop(events);

    expect_silence(&mut rx).await;
    assert_eq!(bridge.state(), SessionState::Idle);
}

#[tokio::test]
async fn test_tool_call_round_trip_with_ui_effect() {
    let store = Arc::new(InMemoryDocumentStore::new());
    store.put("d1", "Service terms", "The SLA is 99.9%.");
    let gateway = Arc::new(create_document_gateway(store));

    let call = ToolCall::new("call-1", "read_document").with_arg("document_id", json!("d1"));
    let pipeline = ScriptedPipeline::with_runs(vec![vec![
        PipelineEvent::ToolCall(call),
        PipelineEvent::TextDelta {
            text: "It is in the service terms.".into(),
        },
    ]]);
    let (bridge, mut rx) = connected(pipeline.clone(), gateway).await;

    bridge
        .handle_message(ClientMessage::Text {
            text: "where is the SLA defined?".into(),
        })
        .await;

    expect_state(&mut rx, WireState::Processing).await;
    expect_message(
        &mut rx,
        ServerMessage::AsrFinal {
            text: "where is the SLA defined?".into(),
        },
    )
    .await;
    expect_message(
        &mut rx,
        ServerMessage::Tool {
            name: "read_document".into(),
            status: ToolStatus::Started,
        },
    )
    .await;

    // The UI side effect reaches the client verbatim
    match next_frame(&mut rx).await {
        OutboundFrame::Control(ServerMessage::UiEffect { effect }) => {
            assert_eq!(
                serde_json::to_value(&effect).unwrap()["document_id"],
                "d1"
            );
        }
        other => panic!("expected ui_effect, got {:?}", other),
    }
    expect_message(
        &mut rx,
        ServerMessage::Tool {
            name: "read_document".into(),
            status: ToolStatus::Succeeded,
        },
    )
    .await;
    expect_message(
        &mut rx,
        ServerMessage::AgentTextPartial {
            text: "It is in the service terms.".into(),
        },
    )
    .await;
    expect_message(
        &mut rx,
        ServerMessage::AgentTextFinal {
            text: "It is in the service terms.".into(),
        },
    )
    .await;
    expect_state(&mut rx, WireState::Idle).await;

    // The result was merged back into the pipeline before it resumed
    let results = pipeline.tool_results();
    assert_eq!(results.len(), 1);
    assert!(results[0].ok);
    assert_eq!(results[0].id, "call-1");
    assert_eq!(results[0].payload["title"], "Service terms");
}

#[tokio::test]
async fn test_admin_tool_denied_for_member_has_no_side_effect() {
    let store = Arc::new(InMemoryDocumentStore::new());
    store.put("d1", "Doc one", "body");
    store.put("d2", "Doc two", "body");
    let gateway = Arc::new(create_document_gateway(store.clone()));

    let call = ToolCall::new("call-9", "delete_document").with_arg("document_id", json!("d1"));
    let pipeline = ScriptedPipeline::with_runs(vec![vec![PipelineEvent::ToolCall(call)]]);
    let (bridge, mut rx) = connected(pipeline.clone(), gateway).await;

    bridge
        .handle_message(ClientMessage::Text {
            text: "delete doc one".into(),
        })
        .await;

    expect_state(&mut rx, WireState::Processing).await;
    expect_message(
        &mut rx,
        ServerMessage::AsrFinal {
            text: "delete doc one".into(),
        },
    )
    .await;
    expect_message(
        &mut rx,
        ServerMessage::Tool {
            name: "delete_document".into(),
            status: ToolStatus::Started,
        },
    )
    .await;
    // Failure: no ui_effect frame in between
    expect_message(
        &mut rx,
        ServerMessage::Tool {
            name: "delete_document".into(),
            status: ToolStatus::Failed,
        },
    )
    .await;
    expect_state(&mut rx, WireState::Idle).await;

    let results = pipeline.tool_results();
    assert_eq!(results.len(), 1);
    assert!(!results[0].ok);
    assert!(results[0].error.as_ref().unwrap().contains("admin role"));

    // Nothing was deleted
    assert_eq!(store.len(), 2);
}

#[tokio::test]
async fn test_benign_pipeline_error_is_not_surfaced() {
    let pipeline = ScriptedPipeline::with_runs(vec![vec![PipelineEvent::Error {
        message: "no speech detected".into(),
    }]]);
    let (bridge, mut rx) = connected(pipeline, empty_gateway()).await;

    bridge.handle_message(ClientMessage::Start).await;
    expect_state(&mut rx, WireState::Listening).await;
    bridge.handle_message(ClientMessage::Stop).await;
    expect_state(&mut rx, WireState::Processing).await;

    // Straight back to idle; no error frame
    expect_state(&mut rx, WireState::Idle).await;
    expect_silence(&mut rx).await;
}

#[tokio::test]
async fn test_pipeline_error_is_surfaced_then_idle() {
    let pipeline = ScriptedPipeline::with_runs(vec![vec![
        PipelineEvent::TextDelta {
            text: "partial answer".into(),
        },
        PipelineEvent::Error {
            message: "inference backend unreachable".into(),
        },
    ]]);
    let (bridge, mut rx) = connected(pipeline, empty_gateway()).await;

    bridge
        .handle_message(ClientMessage::Text {
            text: "anything".into(),
        })
        .await;

    expect_state(&mut rx, WireState::Processing).await;
    expect_message(
        &mut rx,
        ServerMessage::AsrFinal {
            text: "anything".into(),
        },
    )
    .await;
    expect_message(
        &mut rx,
        ServerMessage::AgentTextPartial {
            text: "partial answer".into(),
        },
    )
    .await;
    expect_message(
        &mut rx,
        ServerMessage::Error {
            message: "inference backend unreachable".into(),
        },
    )
    .await;
    // No final flush after a failure; the session resets to idle
    expect_state(&mut rx, WireState::Idle).await;
    expect_silence(&mut rx).await;
}

/// Pipeline whose run entry point itself fails
struct FailingPipeline;

#[async_trait]
impl ConversationPipeline for FailingPipeline {
    async fn open_session(&self, _ctx: &SessionContext) -> CoreResult<()> {
        Ok(())
    }

    async fn run(&self, _ctx: &SessionContext, _input: PipelineInput) -> CoreResult<EventStream> {
        Err(voice_bridge_core::Error::Pipeline(
            "session context missing".into(),
        ))
    }

    async fn push_tool_result(&self, _ctx: &SessionContext, _result: ToolResult) -> CoreResult<()> {
        Ok(())
    }

    async fn interrupt(&self, _ctx: &SessionContext) -> CoreResult<()> {
        Ok(())
    }

    async fn close_session(&self, _ctx: &SessionContext) -> CoreResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_failed_run_entry_is_surfaced_then_idle() {
    let (bridge, mut rx) = connected(Arc::new(FailingPipeline), empty_gateway()).await;

    bridge
        .handle_message(ClientMessage::Text {
            text: "hello?".into(),
        })
        .await;

    expect_state(&mut rx, WireState::Processing).await;
    expect_message(
        &mut rx,
        ServerMessage::AsrFinal {
            text: "hello?".into(),
        },
    )
    .await;
    match next_frame(&mut rx).await {
        OutboundFrame::Control(ServerMessage::Error { message }) => {
            assert!(message.contains("session context missing"));
        }
        other => panic!("expected error message, got {:?}", other),
    }
    expect_state(&mut rx, WireState::Idle).await;
}

#[tokio::test]
async fn test_cleanup_discards_later_input() {
    let pipeline = ScriptedPipeline::with_runs(vec![vec![]]);
    let (bridge, mut rx) = connected(pipeline, empty_gateway()).await;

    bridge.cleanup().await;
    assert_eq!(bridge.state(), SessionState::Disconnected);

    bridge
        .handle_message(ClientMessage::Text {
            text: "anyone there?".into(),
        })
        .await;
    bridge.handle_message(ClientMessage::Start).await;

    expect_silence(&mut rx).await;
}

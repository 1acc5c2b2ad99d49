//! Relay server driven by a synthetic test-pattern engine
//!
//! Run with: cargo run --example relay_server [BIND_ADDR]
//!
//! Examples:
//!   cargo run --example relay_server                  # binds to 0.0.0.0:$PORT (default 3000)
//!   cargo run --example relay_server localhost        # binds to 127.0.0.1:3000
//!   cargo run --example relay_server 127.0.0.1:3001   # binds to 127.0.0.1:3001
//!
//! ## Channels
//!
//!   ws://localhost:3000/video       binary RGB24 frames
//!   ws://localhost:3000/audio       binary PCM blocks
//!   ws://localhost:3000/rom-loaded  "ROM loaded" notifications
//!   ws://localhost:3000/control     JSON input, e.g. {"type":"input","buttons":{"a":true}}
//!
//! Set `CLOUDAMQP_URL` to also accept control messages from the broker.

use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use emu_relay::engine::{Engine, EngineEventSender, FrameInfo};
use emu_relay::{
    event_channel, BrokerBridge, BrokerConfig, ChannelRegistry, ControlRouter, ControlSurface,
    CoordinatorConfig, RelayServer, ServerConfig, StreamCoordinator,
};

const WIDTH: u32 = 256;
const HEIGHT: u32 = 224;
const FRAME_RATE: f64 = 60.0;
const SAMPLE_RATE: u32 = 32_000;

/// Engine that renders scrolling colour bars and a tone
///
/// Pressed buttons tint the bars and the pointer draws a crosshair.
struct TestPatternEngine {
    events: EngineEventSender,
    rom_loaded: AtomicBool,
    paused: Arc<AtomicBool>,
    running: Arc<AtomicBool>,
    buttons: Arc<AtomicU16>,
    pointer: Arc<(AtomicI32, AtomicI32)>,
    frame_thread: Mutex<Option<JoinHandle<()>>>,
}

impl TestPatternEngine {
    fn new(events: EngineEventSender) -> Self {
        Self {
            events,
            rom_loaded: AtomicBool::new(false),
            paused: Arc::new(AtomicBool::new(false)),
            running: Arc::new(AtomicBool::new(false)),
            buttons: Arc::new(AtomicU16::new(0)),
            pointer: Arc::new((AtomicI32::new(-1), AtomicI32::new(-1))),
            frame_thread: Mutex::new(None),
        }
    }
}

impl Engine for TestPatternEngine {
    fn load_rom(&self, path: &Path) -> bool {
        tracing::info!(rom = %path.display(), "Loading test pattern");
        self.rom_loaded.store(true, Ordering::SeqCst);
        self.events.rom_loaded()
    }

    fn is_rom_loaded(&self) -> bool {
        self.rom_loaded.load(Ordering::SeqCst)
    }

    fn is_paused(&self) -> bool {
        self.paused.load(Ordering::SeqCst)
    }

    fn frame_info(&self) -> FrameInfo {
        FrameInfo {
            width: WIDTH,
            height: HEIGHT,
            frame_rate: FRAME_RATE,
        }
    }

    fn set_button_state(&self, _port: u32, buttons: u16) {
        self.buttons.store(buttons, Ordering::Relaxed);
    }

    fn set_pointer_position(&self, _port: u32, x: i32, y: i32) {
        self.pointer.0.store(x, Ordering::Relaxed);
        self.pointer.1.store(y, Ordering::Relaxed);
    }

    fn set_pointer_buttons(&self, port: u32, left: bool, right: bool) {
        tracing::debug!(port, left, right, "Pointer buttons");
    }

    fn reset(&self) {
        self.buttons.store(0, Ordering::Relaxed);
        tracing::info!("Test pattern reset");
    }

    fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::SeqCst);
    }

    fn save_state(&self, _slot: u32) -> bool {
        false
    }

    fn load_state(&self, _slot: u32) -> bool {
        false
    }

    fn save_state_to_file(&self, _path: &Path) -> bool {
        false
    }

    fn load_state_from_file(&self, _path: &Path) -> bool {
        false
    }

    fn start_continuous_execution(&self) {
        let mut thread = self.frame_thread.lock().unwrap_or_else(|e| e.into_inner());
        if thread.is_some() {
            return;
        }
        self.running.store(true, Ordering::SeqCst);

        let events = self.events.clone();
        let running = Arc::clone(&self.running);
        let paused = Arc::clone(&self.paused);
        let buttons = Arc::clone(&self.buttons);
        let pointer = Arc::clone(&self.pointer);

        *thread = Some(std::thread::spawn(move || {
            let frame_time = Duration::from_secs_f64(1.0 / FRAME_RATE);
            let samples_per_frame = (SAMPLE_RATE as f64 / FRAME_RATE) as u32;
            let mut tick = 0u32;
            let mut phase = 0f32;

            while running.load(Ordering::SeqCst) {
                if !paused.load(Ordering::SeqCst) {
                    let video = render_frame(
                        tick,
                        buttons.load(Ordering::Relaxed),
                        pointer.0.load(Ordering::Relaxed),
                        pointer.1.load(Ordering::Relaxed),
                    );
                    events.video(video, WIDTH, HEIGHT, WIDTH * 2, FRAME_RATE);

                    let audio = render_tone(samples_per_frame, &mut phase);
                    events.audio(audio, samples_per_frame);

                    tick = tick.wrapping_add(1);
                }
                std::thread::sleep(frame_time);
            }
        }));
    }

    fn stop_continuous_execution(&self) {
        self.running.store(false, Ordering::SeqCst);
        let handle = self
            .frame_thread
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
        if let Some(handle) = handle {
            let _ = handle.join();
        }
    }
}

/// Eight RGB565 bars scrolling one pixel per frame
fn render_frame(tick: u32, buttons: u16, pointer_x: i32, pointer_y: i32) -> Bytes {
    const BARS: [u16; 8] = [
        0xFFFF, 0xFFE0, 0x07FF, 0x07E0, 0xF81F, 0xF800, 0x001F, 0x0000,
    ];
    let bar_width = WIDTH / BARS.len() as u32;

    let mut buf = BytesMut::with_capacity((WIDTH * HEIGHT * 2) as usize);
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let crosshair = x as i32 == pointer_x || y as i32 == pointer_y;
            let pixel = if crosshair {
                0xFFFF
            } else {
                BARS[(((x + tick) / bar_width) % BARS.len() as u32) as usize] ^ buttons
            };
            buf.put_u16_le(pixel);
        }
    }
    buf.freeze()
}

/// Interleaved stereo 16-bit 440 Hz tone
fn render_tone(samples: u32, phase: &mut f32) -> Bytes {
    let step = 440.0 * std::f32::consts::TAU / SAMPLE_RATE as f32;

    let mut buf = BytesMut::with_capacity(samples as usize * 4);
    for _ in 0..samples {
        let value = (phase.sin() * 0.2 * i16::MAX as f32) as i16;
        buf.put_i16_le(value);
        buf.put_i16_le(value);
        *phase = (*phase + step) % std::f32::consts::TAU;
    }
    buf.freeze()
}

/// Parse bind address from command line argument.
///
/// Accepts formats:
/// - "localhost" -> 127.0.0.1:3000
/// - "127.0.0.1" -> 127.0.0.1:3000
/// - "127.0.0.1:3001" -> 127.0.0.1:3001
fn parse_bind_addr(arg: &str, default_port: u16) -> Result<SocketAddr, String> {
    let normalized = arg.replace("localhost", "127.0.0.1");

    if let Ok(addr) = normalized.parse::<SocketAddr>() {
        return Ok(addr);
    }

    if let Ok(ip) = normalized.parse::<std::net::IpAddr>() {
        return Ok(SocketAddr::new(ip, default_port));
    }

    Err(format!(
        "Invalid bind address: '{}'. Expected format: IP:PORT or IP or 'localhost'",
        arg
    ))
}

fn print_usage() {
    eprintln!("Usage: relay_server [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR    Address to bind to (default: 0.0.0.0:$PORT, PORT defaults to 3000)");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let mut config = ServerConfig::from_env();
    if let Some(addr_str) = args.get(1) {
        match parse_bind_addr(addr_str, config.bind_addr.port()) {
            Ok(addr) => config = config.bind(addr),
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("emu_relay=info".parse()?)
                .add_directive("relay_server=debug".parse()?),
        )
        .init();

    let coordinator_config = CoordinatorConfig::default();
    let (events, event_rx) = event_channel(coordinator_config.event_queue_capacity);
    let engine = Arc::new(TestPatternEngine::new(events));

    let registry = Arc::new(ChannelRegistry::new());
    let router = ControlRouter::new(engine.clone());
    let surface = ControlSurface::from_env(engine.clone(), &coordinator_config.quicksave_path);

    let coordinator = Arc::new(StreamCoordinator::new(
        Arc::clone(&registry),
        engine.clone(),
        coordinator_config,
    ));
    let coordinator_task = coordinator.spawn(event_rx);

    let bridge = BrokerBridge::new(BrokerConfig::from_env(), router.clone());
    if let Err(e) = bridge.start().await {
        tracing::warn!(error = %e, "Continuing without broker control");
    }

    if surface.load_rom(Path::new("test-pattern")).is_none() {
        tracing::error!("Test pattern failed to start");
    }
    tracing::info!(admin = surface.admin_enabled(), status = ?surface.status(), "Engine ready");

    let server = RelayServer::new(config, registry, router);

    tokio::select! {
        result = server.run() => {
            if let Err(e) = result {
                eprintln!("Server error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    bridge.stop().await;
    engine.stop_continuous_execution();
    coordinator_task.abort();

    let stats = coordinator.stats();
    let info = coordinator.frame_info();
    println!(
        "Stats: video={} audio={} skipped_video={} skipped_audio={}",
        stats.video_frames, stats.audio_blocks, stats.skipped_video, stats.skipped_audio
    );
    println!(
        "Output: {}x{} @ {:.2} fps, {:.1}% of frames encoded",
        info.width,
        info.height,
        info.frame_rate,
        stats.video_utilization() * 100.0
    );

    Ok(())
}

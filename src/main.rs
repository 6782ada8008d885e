#[cfg(not(feature = "playback"))]
fn main() {
    eprintln!(
        "The cantara CLI requires the \"playback\" feature. Rebuild with `--features playback` to enable audio output."
    );
}

#[cfg(feature = "playback")]
mod cli {
    use std::env;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use log::info;

    use cantara::clock::RodioClock;
    use cantara::presentation::PresentationSink;
    use cantara::score::{ScoreResult, ScoreTier};
    use cantara::session::{SessionController, SessionState};
    use cantara::store::{MemoryStore, QueuedSong};
    use cantara::VideoFrame;

    const POLL: Duration = Duration::from_millis(50);

    /// Parsed command-line arguments.
    #[derive(Debug, Default)]
    pub struct CliArgs {
        /// Media files queued in order.
        pub files: Vec<String>,
        /// Initial pitch shift in semitones.
        pub pitch: i32,
        /// Disable the video frame pipeline.
        pub no_video: bool,
        /// Remote-control port (None = remote disabled).
        pub remote_port: Option<u16>,
        /// Event name shown in logs.
        pub event: Option<String>,
        /// Whether help was requested.
        pub show_help: bool,
    }

    impl CliArgs {
        /// Parse arguments from the command line.
        pub fn parse() -> Self {
            let mut args = Self::default();
            let mut iter = env::args().skip(1);

            while let Some(arg) = iter.next() {
                match arg.as_str() {
                    "--help" | "-h" => {
                        args.show_help = true;
                    }
                    "--no-video" => {
                        args.no_video = true;
                    }
                    "--pitch" => match iter.next().and_then(|v| v.parse().ok()) {
                        Some(n) => args.pitch = n,
                        None => {
                            eprintln!("--pitch requires an integer argument");
                            args.show_help = true;
                        }
                    },
                    "--remote-port" => match iter.next().and_then(|v| v.parse().ok()) {
                        Some(p) => args.remote_port = Some(p),
                        None => {
                            eprintln!("--remote-port requires a port number");
                            args.show_help = true;
                        }
                    },
                    "--event" => match iter.next() {
                        Some(name) => args.event = Some(name),
                        None => {
                            eprintln!("--event requires a name");
                            args.show_help = true;
                        }
                    },
                    _ if arg.starts_with('-') => {
                        eprintln!("Unknown flag: {}", arg);
                        args.show_help = true;
                    }
                    _ => args.files.push(arg),
                }
            }

            args
        }

        /// Print help text to stderr.
        pub fn print_help() {
            eprintln!(
                "Usage:\n  cantara [flags] <file.mp4> [more files...]\n\n\
                 Flags:\n\
                 \x20 --pitch <n>          Initial pitch shift in semitones, -12..=12 (default 0)\n\
                 \x20 --no-video           Audio-only playback, skip the frame decoder\n\
                 \x20 --remote-port <p>    Accept remote-control commands on 127.0.0.1:<p>\n\
                 \x20 --event <name>       Event name used in logs (default \"cantara\")\n\
                 \x20 --help, -h           Show this help"
            );
        }
    }

    /// Sink writing engine output to the terminal and the log.
    struct ConsoleSink;

    impl PresentationSink for ConsoleSink {
        fn frame(&self, _frame: VideoFrame) {
            // Headless binary: frames are decoded for pacing parity but
            // there is no surface to draw them on.
        }

        fn status(&self, text: &str) {
            println!("* {}", text);
        }

        fn meter_db(&self, db: f32) {
            log::trace!("mic level {:.1} dBFS", db);
        }

        fn score(&self, result: ScoreResult) {
            if result.scored {
                let tier = match result.tier {
                    ScoreTier::Outstanding => "outstanding!",
                    ScoreTier::Great => "great",
                    ScoreTier::Good => "good",
                    ScoreTier::KeepPracticing => "keep practicing",
                };
                println!("score: {} / 100 ({})", result.points, tier);
            } else {
                println!("score: no vocals captured");
            }
        }

        fn session_complete(&self) {
            println!("playlist finished");
        }
    }

    pub fn run() -> anyhow::Result<()> {
        env_logger::init();

        let args = CliArgs::parse();
        if args.show_help || args.files.is_empty() {
            CliArgs::print_help();
            return Ok(());
        }

        let event = args.event.as_deref().unwrap_or("cantara");
        let mut store = MemoryStore::new(event);
        for (order, file) in args.files.iter().enumerate() {
            store.enqueue(QueuedSong::new(file.as_str(), "", order as u32));
        }
        info!("{} songs queued for {}", args.files.len(), event);

        let clock = RodioClock::new()?;
        let mut session = SessionController::new(
            Box::new(clock),
            Box::new(store),
            Arc::new(ConsoleSink),
        );
        if args.no_video {
            session.set_video_enabled(false);
        }

        #[cfg(feature = "remote")]
        let (mut listener, remote_rx) = match args.remote_port {
            Some(port) => {
                let (tx, rx) = std::sync::mpsc::channel();
                let listener = cantara::remote::RemoteListener::bind(port, tx)?;
                (Some(listener), Some(rx))
            }
            None => (None, None),
        };
        #[cfg(not(feature = "remote"))]
        if args.remote_port.is_some() {
            eprintln!("remote control not compiled in; ignoring --remote-port");
        }

        if !session.load_next()? {
            return Ok(());
        }
        if args.pitch != 0 {
            session.request_shift(args.pitch)?;
            while session.state() == SessionState::ShiftPending {
                session.pump();
                thread::sleep(POLL);
            }
        }
        session.play()?;

        loop {
            session.pump();

            #[cfg(feature = "remote")]
            if let Some(rx) = &remote_rx {
                while let Ok(command) = rx.try_recv() {
                    if !apply_remote(&mut session, command) {
                        session.stop()?;
                        if let Some(listener) = listener.as_mut() {
                            listener.stop();
                        }
                        return Ok(());
                    }
                }
            }

            if session.state() == SessionState::Idle {
                break;
            }
            thread::sleep(POLL);
        }

        #[cfg(feature = "remote")]
        if let Some(listener) = listener.as_mut() {
            listener.stop();
        }
        Ok(())
    }

    /// Apply one remote command. Returns false on `quit`.
    #[cfg(feature = "remote")]
    fn apply_remote(
        session: &mut SessionController,
        command: cantara::remote::RemoteCommand,
    ) -> bool {
        use cantara::remote::RemoteCommand;
        use cantara::store::QueuedSong;

        let outcome = match command {
            RemoteCommand::Load { path } => session.load(QueuedSong::new(path, "", 0)),
            RemoteCommand::Play => session.play(),
            RemoteCommand::Pause => session.pause(),
            RemoteCommand::Stop => session.stop(),
            RemoteCommand::Pitch { semitones } => session.request_shift(semitones),
            RemoteCommand::Seek { seconds } => session.seek(seconds),
            RemoteCommand::Quit => return false,
        };
        // Fire-and-forget protocol: failures are logged, never answered.
        if let Err(e) = outcome {
            log::warn!("remote command failed: {}", e);
        }
        true
    }
}

#[cfg(feature = "playback")]
fn main() {
    if let Err(e) = cli::run() {
        eprintln!("cantara: {:#}", e);
        std::process::exit(1);
    }
}

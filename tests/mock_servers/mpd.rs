#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Mock MPD server for testing
//!
//! Speaks the line protocol on a random local port: greeting, `key: value`
//! replies terminated by `OK`, `ACK` on errors. Playback commands mutate the
//! state so later `status` replies reflect them. Failure knobs let tests cut
//! connections mid-session or refuse new ones.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

/// One library entry answering `list` queries
#[derive(Debug, Clone)]
pub struct MockTrack {
    pub artist: String,
    pub album: String,
    pub genre: String,
}

impl MockTrack {
    pub fn new(artist: &str, album: &str, genre: &str) -> Self {
        Self {
            artist: artist.to_string(),
            album: album.to_string(),
            genre: genre.to_string(),
        }
    }

    fn tag(&self, tag: &str) -> Option<&str> {
        match tag.to_ascii_lowercase().as_str() {
            "artist" => Some(&self.artist),
            "album" => Some(&self.album),
            "genre" => Some(&self.genre),
            _ => None,
        }
    }
}

/// Mock MPD state
#[derive(Debug, Clone)]
pub struct MockMpdState {
    pub state: String, // play, pause or stop
    pub volume: i32,
    pub repeat: bool,
    pub random: bool,
    pub single: bool,
    pub song_id: u32,
    pub elapsed: f64,
    pub duration: u32,
    pub artist: String,
    pub album: String,
    pub title: String,
    pub library: Vec<MockTrack>,

    /// Close each connection instead of answering its Nth `status` (1-based)
    pub drop_on_status: Option<usize>,
    /// Connections beyond this many get a bogus greeting and are closed
    pub accept_limit: Option<usize>,
    /// Answer `currentsong` with an ACK
    pub fail_current_song: bool,

    /// Connections accepted so far
    pub connections: usize,
    /// `status` requests received across all connections
    pub status_requests: usize,
    /// Every command line received, in order
    pub received: Vec<String>,
}

impl Default for MockMpdState {
    fn default() -> Self {
        Self {
            state: "stop".to_string(),
            volume: 50,
            repeat: false,
            random: false,
            single: false,
            song_id: 1,
            elapsed: 0.0,
            duration: 0,
            artist: String::new(),
            album: String::new(),
            title: String::new(),
            library: vec![
                MockTrack::new("Daft Punk", "Discovery", "Electronic"),
                MockTrack::new("Daft Punk", "Homework", "Electronic"),
                MockTrack::new("Miles Davis", "Kind of Blue", "Jazz"),
                MockTrack::new("Nirvana", "Nevermind", "Rock"),
            ],
            drop_on_status: None,
            accept_limit: None,
            fail_current_song: false,
            connections: 0,
            status_requests: 0,
            received: Vec::new(),
        }
    }
}

/// Mock MPD server
pub struct MockMpdServer {
    addr: SocketAddr,
    state: Arc<RwLock<MockMpdState>>,
    handle: JoinHandle<()>,
}

impl MockMpdServer {
    /// Start a mock MPD server on a random port
    pub async fn start() -> Self {
        Self::start_with(MockMpdState::default()).await
    }

    pub async fn start_with(initial: MockMpdState) -> Self {
        let state = Arc::new(RwLock::new(initial));
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let state_clone = state.clone();
        let handle = tokio::spawn(async move {
            loop {
                match listener.accept().await {
                    Ok((stream, _)) => {
                        let state = state_clone.clone();
                        tokio::spawn(async move {
                            handle_connection(stream, state).await;
                        });
                    }
                    Err(_) => break,
                }
            }
        });

        Self {
            addr,
            state,
            handle,
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `host:port` string for the client
    pub fn address(&self) -> String {
        self.addr().to_string()
    }

    /// Start playing a song
    pub async fn set_playing(&self, artist: &str, album: &str, title: &str) {
        let mut state = self.state.write().await;
        state.state = "play".to_string();
        state.artist = artist.to_string();
        state.album = album.to_string();
        state.title = title.to_string();
        state.elapsed = 12.5;
        state.duration = 240;
    }

    pub async fn set_volume(&self, volume: i32) {
        self.state.write().await.volume = volume;
    }

    pub async fn snapshot(&self) -> MockMpdState {
        self.state.read().await.clone()
    }

    pub async fn connections(&self) -> usize {
        self.state.read().await.connections
    }

    pub async fn received(&self) -> Vec<String> {
        self.state.read().await.received.clone()
    }

    /// Stop the mock server
    pub async fn stop(self) {
        self.handle.abort();
    }
}

/// What to do after processing a command
enum Reply {
    Send(String),
    Hangup,
}

/// Handle a single TCP connection
async fn handle_connection(stream: TcpStream, state: Arc<RwLock<MockMpdState>>) {
    let (reader, mut writer) = stream.into_split();
    let mut reader = BufReader::new(reader);

    let accepted = {
        let mut state = state.write().await;
        state.connections += 1;
        state.accept_limit.map_or(true, |limit| state.connections <= limit)
    };
    let greeting: &[u8] = if accepted {
        b"OK MPD 0.23.5\n"
    } else {
        b"BUSY try later\n"
    };
    if writer.write_all(greeting).await.is_err() || !accepted {
        return;
    }

    let mut statuses_on_connection = 0;
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => break, // Connection closed
            Ok(_) => {
                let command = line.trim().to_string();
                if command == "status" {
                    statuses_on_connection += 1;
                }
                let reply = process_command(&command, statuses_on_connection, &state).await;
                match reply {
                    Reply::Send(response) => {
                        if writer.write_all(response.as_bytes()).await.is_err() {
                            break;
                        }
                    }
                    Reply::Hangup => break,
                }
            }
            Err(_) => break,
        }
    }
}

/// Split a command line into words, honouring double quotes
fn tokenize(line: &str) -> Vec<String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => quoted = !quoted,
            '\\' if quoted => {
                if let Some(escaped) = chars.next() {
                    current.push(escaped);
                }
            }
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    words.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn ack(command: &str, message: &str) -> Reply {
    Reply::Send(format!("ACK [5@0] {{{}}} {}\n", command, message))
}

fn flag(value: bool) -> u8 {
    u8::from(value)
}

fn parse_switch(command: &str, args: &[String]) -> Result<bool, Reply> {
    match args.first().map(String::as_str) {
        Some("0") => Ok(false),
        Some("1") => Ok(true),
        _ => Err(ack(command, "Boolean (0/1) expected")),
    }
}

/// Process a command and return a reply
async fn process_command(
    command: &str,
    statuses_on_connection: usize,
    state: &Arc<RwLock<MockMpdState>>,
) -> Reply {
    let mut state = state.write().await;
    state.received.push(command.to_string());

    let words = tokenize(command);
    let Some((name, args)) = words.split_first() else {
        return ack("", "No command given");
    };

    match name.as_str() {
        "status" => {
            state.status_requests += 1;
            if state.drop_on_status == Some(statuses_on_connection) {
                return Reply::Hangup;
            }
            let mut out = format!(
                "volume: {}\nrepeat: {}\nrandom: {}\nsingle: {}\nconsume: 0\nplaylist: 7\nplaylistlength: 4\nstate: {}\n",
                state.volume,
                flag(state.repeat),
                flag(state.random),
                flag(state.single),
                state.state
            );
            if state.state != "stop" {
                out.push_str(&format!(
                    "song: {}\nsongid: {}\nelapsed: {:.3}\nduration: {}.000\nbitrate: 320\naudio: 44100:16:2\n",
                    state.song_id.saturating_sub(1),
                    state.song_id,
                    state.elapsed,
                    state.duration
                ));
            }
            out.push_str("OK\n");
            Reply::Send(out)
        }
        "currentsong" => {
            if state.fail_current_song {
                return Reply::Send("ACK [50@0] {currentsong} No current song\n".to_string());
            }
            if state.state == "stop" {
                return Reply::Send("OK\n".to_string());
            }
            Reply::Send(format!(
                "file: music/{}.flac\nArtist: {}\nAlbum: {}\nTitle: {}\nPos: {}\nId: {}\nduration: {}.000\nOK\n",
                state.title,
                state.artist,
                state.album,
                state.title,
                state.song_id.saturating_sub(1),
                state.song_id,
                state.duration
            ))
        }
        "list" => {
            let Some(tag) = args.first() else {
                return ack("list", "too few arguments");
            };
            let filters = &args[1..];
            if filters.len() % 2 != 0 {
                return ack("list", "not able to parse args");
            }
            let key = {
                let mut chars = tag.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            };
            let mut values: Vec<&str> = Vec::new();
            for track in &state.library {
                let matches = filters
                    .chunks(2)
                    .all(|pair| track.tag(&pair[0]) == Some(pair[1].as_str()));
                if !matches {
                    continue;
                }
                match track.tag(tag) {
                    Some(value) if !values.contains(&value) => values.push(value),
                    Some(_) => {}
                    None => return ack("list", "Unknown tag type"),
                }
            }
            let mut out: String = values
                .iter()
                .map(|value| format!("{}: {}\n", key, value))
                .collect();
            out.push_str("OK\n");
            Reply::Send(out)
        }
        "play" => {
            if let Some(pos) = args.first() {
                match pos.parse::<u32>() {
                    Ok(pos) if pos < 4 => state.song_id = pos + 1,
                    _ => return ack("play", "Bad song index"),
                }
            }
            state.state = "play".to_string();
            Reply::Send("OK\n".to_string())
        }
        "playid" => {
            if let Some(id) = args.first() {
                match id.parse::<u32>() {
                    Ok(id) if (1..=4).contains(&id) => state.song_id = id,
                    _ => return Reply::Send("ACK [50@0] {playid} No such song\n".to_string()),
                }
            }
            state.state = "play".to_string();
            Reply::Send("OK\n".to_string())
        }
        "pause" => {
            let paused = match parse_switch("pause", args) {
                Ok(paused) => paused,
                Err(reply) => return reply,
            };
            if state.state != "stop" {
                state.state = if paused { "pause" } else { "play" }.to_string();
            }
            Reply::Send("OK\n".to_string())
        }
        "random" | "repeat" | "single" => {
            let enabled = match parse_switch(name, args) {
                Ok(enabled) => enabled,
                Err(reply) => return reply,
            };
            match name.as_str() {
                "random" => state.random = enabled,
                "repeat" => state.repeat = enabled,
                _ => state.single = enabled,
            }
            Reply::Send("OK\n".to_string())
        }
        "next" => {
            state.song_id = (state.song_id % 4) + 1;
            Reply::Send("OK\n".to_string())
        }
        "previous" => {
            state.song_id = if state.song_id <= 1 { 4 } else { state.song_id - 1 };
            Reply::Send("OK\n".to_string())
        }
        other => ack(other, &format!("unknown command \"{}\"", other)),
    }
}

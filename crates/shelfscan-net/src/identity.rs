use rand::seq::SliceRandom;
use rand::Rng;

const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_2) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.2 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:121.0) Gecko/20100101 Firefox/121.0",
];

const ACCEPT_LANGUAGES: [&str; 3] = ["en-US,en;q=0.9", "en-US,en;q=0.8", "en-US,en;q=0.5"];

const VIEWPORTS: [(u32, u32); 4] = [(1920, 1080), (1366, 768), (1536, 864), (1440, 900)];

/// Browser identity presented to a retail site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_agent: String,
    pub accept_language: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl Identity {
    /// Pick a random desktop identity.
    pub fn randomized() -> Self {
        let mut rng = rand::thread_rng();
        let (width, height) = VIEWPORTS[rng.gen_range(0..VIEWPORTS.len())];

        Self {
            user_agent: USER_AGENTS[rng.gen_range(0..USER_AGENTS.len())].to_string(),
            accept_language: ACCEPT_LANGUAGES[rng.gen_range(0..ACCEPT_LANGUAGES.len())]
                .to_string(),
            viewport_width: width,
            viewport_height: height,
        }
    }

    /// Pick a random identity whose user agent differs from this one.
    pub fn rotated(&self) -> Self {
        let mut rng = rand::thread_rng();
        let candidates: Vec<&str> = USER_AGENTS
            .iter()
            .copied()
            .filter(|ua| *ua != self.user_agent)
            .collect();

        let mut next = Self::randomized();
        if let Some(ua) = candidates.choose(&mut rng) {
            next.user_agent = (*ua).to_string();
        }
        next
    }
}

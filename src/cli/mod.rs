use clap::Subcommand;

#[derive(Subcommand)]
pub enum Commands {
    /// Talk to the assistant interactively (one message per line)
    Chat {
        /// Session id to use; a fresh one is generated when omitted
        #[arg(long)]
        session: Option<String>,
    },

    /// Send a single message and print the reply
    Ask {
        message: String,
    },

    /// Serve the assistant over HTTP as JSON
    Serve {
        #[arg(long, default_value = "8080")]
        port: u16,

        /// Bind to 0.0.0.0 instead of 127.0.0.1
        #[arg(long)]
        public: bool,
    },

    /// Search the catalog directly
    Search {
        /// Free text matched against track, album, artist and genre names
        query: Option<String>,

        #[arg(short, long)]
        artist: Option<String>,

        #[arg(long)]
        album: Option<String>,

        #[arg(short, long)]
        genre: Option<String>,

        /// Decade start year, e.g. 1980
        #[arg(short, long)]
        decade: Option<i32>,

        /// Recommend tracks by other artists sharing a genre with this one
        #[arg(long)]
        similar_to: Option<String>,

        /// List albums instead of tracks
        #[arg(long)]
        albums: bool,

        #[arg(long, default_value = "10")]
        num: usize,
    },

    /// List a customer's purchases
    Purchases {
        #[arg(short, long)]
        invoice: Option<i64>,

        #[arg(short, long)]
        name: Option<String>,

        #[arg(short, long)]
        phone: Option<String>,
    },

    /// Create the store and load the sample data if it is empty
    Seed,
}

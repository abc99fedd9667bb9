use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "classync")]
#[command(about = "Offline request queue and sync for the classroom dashboard")]
#[command(long_about = "classync - offline-first writes for the classroom dashboard

Classroom changes are sent to the dashboard API when it is reachable and
queued locally when it is not. Queued requests are replayed oldest first
once the connection returns, with placeholder ids of offline-created
classrooms swapped for the ids the server assigns.

QUICK START:
  classync classroom add 5 A Maths     Create a classroom (queued if offline)
  classync queue list                  Show requests waiting to sync
  classync sync                        Replay the queue now
  classync watch                       Sync automatically on reconnect

OUTPUT FORMATS:
  --output pretty    Human-readable colored output (default)
  --output json      Machine-readable JSON for scripting

For more information on a specific command, run:
  classync <command> --help")]
#[command(version, propagate_version = true)]
pub struct Cli {
    /// Output format for command results
    ///
    /// Use 'pretty' for human-readable colored output, or 'json' for
    /// machine-readable output suitable for scripting. Defaults to
    /// `general.default_output` from the config file.
    #[arg(short, long, value_enum, global = true)]
    pub output: Option<OutputFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Output format for command results.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable colored output.
    #[default]
    Pretty,
    /// Machine-readable JSON output.
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Inspect and manage the offline request queue
    ///
    /// # Examples
    ///
    ///   classync queue status
    ///   classync queue list
    ///   classync queue remove 3
    ///   classync queue cancel temp-1718000000000-k3j9x0abc
    ///   classync queue clear --force
    #[command(alias = "q")]
    Queue(QueueArgs),

    /// Replay queued requests now
    ///
    /// Runs one sync pass: every queued request is sent oldest first.
    /// Successful requests leave the queue; failed ones stay for the next
    /// pass.
    Sync,

    /// Watch connectivity and sync on every reconnect
    ///
    /// Polls the API host and starts a sync pass each time it becomes
    /// reachable again. Runs until the process is killed.
    Watch {
        /// Seconds between connectivity checks (default from config)
        #[arg(long, short = 'i')]
        interval: Option<u64>,
    },

    /// Manage classrooms through the offline-aware write path
    ///
    /// # Examples
    ///
    ///   classync classroom list
    ///   classync classroom add 5 A Maths
    ///   classync classroom progress cls-55 0,1,2
    ///   classync classroom delete cls-55
    #[command(alias = "c")]
    Classroom(ClassroomArgs),
}

/// Arguments for queue management.
#[derive(Args)]
pub struct QueueArgs {
    #[command(subcommand)]
    pub command: QueueCommands,
}

/// Queue subcommands.
#[derive(Subcommand)]
pub enum QueueCommands {
    /// Show queue status
    ///
    /// Displays how many requests are waiting, how many are failing, and
    /// the age of the oldest.
    Status,

    /// List queued requests in replay order
    List,

    /// Queue a request directly
    ///
    /// The request is stored as given and replayed on the next sync.
    Add {
        /// HTTP method
        #[arg(long, short = 'X', default_value = "POST")]
        method: String,

        /// Target URL, absolute or relative to the API base URL
        url: String,

        /// JSON body
        #[arg(long, short = 'd')]
        body: Option<String>,

        /// Header as NAME:VALUE (repeatable)
        #[arg(long = "header", short = 'H')]
        headers: Vec<String>,

        /// Temp id the request creates
        #[arg(long)]
        temp_id: Option<String>,
    },

    /// Remove a queued request by id
    #[command(alias = "rm")]
    Remove {
        /// Queue entry id
        id: i64,
    },

    /// Cancel a never-synced creation by its temp id
    Cancel {
        /// Temp id given when the creation was queued
        temp_id: String,
    },

    /// Remove every queued request
    Clear {
        /// Skip confirmation
        #[arg(long, short = 'f')]
        force: bool,
    },
}

/// Arguments for classroom commands.
#[derive(Args)]
pub struct ClassroomArgs {
    #[command(subcommand)]
    pub command: ClassroomCommands,
}

/// Classroom subcommands.
#[derive(Subcommand)]
pub enum ClassroomCommands {
    /// List classrooms from the server
    List,

    /// Create a classroom
    Add {
        /// Grade, e.g. 5
        grade: String,
        /// Section, e.g. A
        section: String,
        /// Subject, e.g. Maths
        subject: String,
    },

    /// Delete a classroom
    ///
    /// Deleting a classroom that only exists offline (temp id) withdraws
    /// its queued creation.
    Delete {
        /// Classroom id or temp id
        id: String,
    },

    /// Set the completed chapters of a classroom
    Progress {
        /// Classroom id or temp id
        id: String,

        /// Completed chapter numbers, comma separated
        #[arg(value_delimiter = ',')]
        chapters: Vec<u32>,
    },
}

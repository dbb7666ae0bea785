use anyhow::Context;
use clap::Parser;
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use sodia::{
    config::Settings,
    db,
    models::{CreateCommentRequest, CreatePostRequest, NewUser},
    repositories::{
        CommentRepository, PostRepository, SqliteCommentRepository, SqlitePostRepository,
        SqliteUserRepository, UserRepository,
    },
    services::password::hash_password,
};

const USERNAMES: &[&str] = &[
    "alice", "bob", "charlie", "dave", "eve", "frank", "grace", "heidi", "ivan", "judy", "karl",
    "laura", "mallory", "nina", "oscar", "peggy", "quinn", "rachel", "sybil", "trent",
];

const TITLES: &[&str] = &[
    "Ownership in Practice",
    "Sharing a Weekend Hike",
    "Notes on Sourdough",
    "Why I Switched Editors",
    "A Week Without Coffee",
    "Reading List for Autumn",
    "Small Gardens, Big Harvest",
    "Learning to Juggle",
    "Fixing an Old Bicycle",
    "Cheap Travel Tips",
];

const CONTENTS: &[&str] = &[
    "Writing this down so I remember it next time.",
    "Took longer than expected, but worth every minute.",
    "Happy to hear what others think about this approach.",
    "Started as a small experiment and grew from there.",
    "The hardest part was getting started at all.",
    "Short post today, more details coming soon.",
];

const TAGS: &[&str] = &[
    "rust", "travel", "food", "books", "garden", "fitness", "tech", "music", "diy", "life",
];

const COMMENTS: &[&str] = &[
    "Great post!",
    "Thanks for sharing.",
    "I had the same experience.",
    "Could you write more about this?",
    "Bookmarked for later.",
    "Not sure I agree, but interesting read.",
    "This helped me a lot.",
];

const DEFAULT_PASSWORD: &str = "password123";

#[derive(Parser)]
#[command(name = "sodia-seed")]
#[command(about = "Fill the Sodia database with sample users, posts and comments", long_about = None)]
struct Cli {
    /// Number of users to create
    #[arg(short, long, default_value_t = 100)]
    users: usize,

    /// Number of posts to create
    #[arg(short, long, default_value_t = 200)]
    posts: usize,

    /// Number of comments to create
    #[arg(short, long, default_value_t = 500)]
    comments: usize,
}

fn pick<'a>(rng: &mut StdRng, items: &[&'a str]) -> &'a str {
    items.choose(rng).copied().unwrap_or_default()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "seed=info,sodia=info".into()),
        )
        .init();

    let cli = Cli::parse();
    let settings = Settings::from_env().context("invalid configuration")?;

    let pool = db::create_pool(&settings.database).await?;
    db::run_migrations(&pool).await?;

    let users = SqliteUserRepository::new(pool.clone());
    let posts = SqlitePostRepository::new(pool.clone());
    let comments = SqliteCommentRepository::new(pool);
    let mut rng = StdRng::from_entropy();

    // One hash for every seeded account.
    let password_hash = hash_password(DEFAULT_PASSWORD)
        .map_err(|e| anyhow::anyhow!("failed to hash password: {}", e))?;

    let run_id: u32 = rng.gen_range(1000..10000);
    let mut user_ids = Vec::with_capacity(cli.users);
    for i in 0..cli.users {
        let username = format!("{}{}_{}", pick(&mut rng, USERNAMES), run_id, i);
        let user = users
            .create_user(
                &NewUser {
                    email: format!("{}@example.com", username),
                    username,
                    password_hash: password_hash.clone(),
                },
                true,
            )
            .await?;
        user_ids.push(user.id);
    }
    tracing::info!("Created {} users", user_ids.len());

    if user_ids.is_empty() {
        tracing::warn!("No users created, skipping posts and comments");
        return Ok(());
    }

    let mut post_ids = Vec::with_capacity(cli.posts);
    for _ in 0..cli.posts {
        let tags = TAGS
            .choose_multiple(&mut rng, 2)
            .map(|t| t.to_string())
            .collect();
        let request = CreatePostRequest {
            title: pick(&mut rng, TITLES).to_string(),
            content: pick(&mut rng, CONTENTS).to_string(),
            tags,
            user_id: user_ids[rng.gen_range(0..user_ids.len())],
        };
        let post = posts.create(&request).await?;
        post_ids.push(post.id);
    }
    tracing::info!("Created {} posts", post_ids.len());

    if post_ids.is_empty() {
        return Ok(());
    }

    for _ in 0..cli.comments {
        let post_id = post_ids[rng.gen_range(0..post_ids.len())];
        let request = CreateCommentRequest {
            user_id: user_ids[rng.gen_range(0..user_ids.len())],
            content: pick(&mut rng, COMMENTS).to_string(),
        };
        comments.create(post_id, &request).await?;
    }
    tracing::info!("Created {} comments", cli.comments);

    tracing::info!("Seeding complete");
    Ok(())
}

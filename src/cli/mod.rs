use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    // --- Conversation Store Args ---
    /// Conversation record store type (cosmos, redis, memory)
    #[arg(long, env = "STORE_TYPE", default_value = "cosmos")]
    pub store_type: String,

    /// Cosmos DB account endpoint (e.g., https://myaccount.documents.azure.com:443/)
    #[arg(long, env = "COSMOS_ENDPOINT")]
    pub cosmos_endpoint: Option<String>,

    /// Cosmos DB account master key (base64)
    #[arg(long, env = "COSMOS_KEY")]
    pub cosmos_key: Option<String>,

    /// Database holding the conversation collection. Created on first use.
    #[arg(long, env = "DB_NAME", default_value = "call_assist")]
    pub db_name: String,

    /// Collection holding one record per call. Created on first use.
    #[arg(long, env = "DB_CONTAINER", default_value = "chat_history")]
    pub db_container: String,

    /// Redis endpoint when STORE_TYPE=redis (e.g., redis://127.0.0.1:6379)
    #[arg(long, env = "REDIS_URL", default_value = "redis://127.0.0.1:6379")]
    pub redis_url: String,

    /// Prefix for Redis keys.
    #[arg(long, env = "REDIS_PREFIX", default_value = "call_assist:")]
    pub redis_prefix: String,

    // --- Chat LLM Provider Args ---
    /// Type of LLM provider for chat completion (openai, azure)
    #[arg(long, env = "CHAT_LLM_TYPE", default_value = "azure")]
    pub chat_llm_type: String,

    /// Base URL (openai) or resource endpoint (azure) of the chat provider
    #[arg(long, env = "CHAT_BASE_URL")]
    pub chat_base_url: Option<String>,

    /// API Key for the chat provider
    #[arg(long, env = "CHAT_API_KEY", default_value = "")]
    pub chat_api_key: String,

    /// Model name for chat completion (openai)
    #[arg(long, env = "CHAT_MODEL")]
    pub chat_model: Option<String>,

    /// Deployment name (azure)
    #[arg(long, env = "CHAT_DEPLOYMENT")]
    pub chat_deployment: Option<String>,

    /// API version query parameter (azure)
    #[arg(long, env = "CHAT_API_VERSION", default_value = "2024-06-01")]
    pub chat_api_version: String,

    /// Rounds of automatic tool invocation before a text answer is forced.
    #[arg(long, env = "MAX_TOOL_ROUNDS", default_value = "5")]
    pub max_tool_rounds: usize,

    // --- Tool Backend Args ---
    /// Knowledge search service endpoint (e.g., https://mysearch.search.windows.net)
    #[arg(long, env = "SEARCH_ENDPOINT")]
    pub search_endpoint: Option<String>,

    /// Knowledge search API key
    #[arg(long, env = "SEARCH_API_KEY", default_value = "")]
    pub search_api_key: String,

    /// Knowledge search index name
    #[arg(long, env = "SEARCH_INDEX", default_value = "knowledge")]
    pub search_index: String,

    /// Benefits search API endpoint
    #[arg(long, env = "BENEFITS_ENDPOINT")]
    pub benefits_endpoint: Option<String>,

    /// Benefits search API key
    #[arg(long, env = "BENEFITS_API_KEY", default_value = "")]
    pub benefits_api_key: String,

    // --- General App Args ---
    /// Optional path to a prompt configuration file. Built-in prompts are used when unset.
    #[arg(long, env = "PROMPTS_PATH")]
    pub prompts_path: Option<String>,

    /// Host address and port for the HTTP server to listen on.
    #[arg(long, env = "SERVER_ADDR", default_value = "0.0.0.0:8000")]
    pub server_addr: String,

    /// Optional path to the TLS certificate file (PEM format). Requires --tls-key-path.
    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert_path: Option<String>,

    /// Optional path to the TLS private key file (PEM format). Requires --tls-cert-path.
    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key_path: Option<String>,

    #[arg(long, env = "ENABLE_TLS", default_value = "false")]
    pub enable_tls: bool,
}

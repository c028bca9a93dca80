use std::env;

#[derive(Clone, Debug)]
pub struct Config {
    pub db_host: String,
    pub db_port: u16,
    pub db_name: String,
    pub db_user: String,
    pub db_pass: String,
    pub db_pool_size: u32,
    pub db_acquire_timeout_secs: u64,
    pub server_host: String,
    pub server_port: u16,
    pub nhtsa_base: String,
    pub nhtsa_recalls: String,
    pub nhtsa_complaints: String,
    pub nhtsa_ratings: String,
    pub epa_base: String,
    pub tc_recalls: String,
    pub upload_dir: String,
}

impl Config {
    pub fn from_env() -> Result<Self, env::VarError> {
        dotenvy::dotenv().ok();

        Ok(Config {
            db_host: env::var("DB_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            db_port: env::var("DB_PORT")
                .unwrap_or_else(|_| "5432".to_string())
                .parse()
                .unwrap_or(5432),
            db_name: env::var("DB_NAME").unwrap_or_else(|_| "autoverif_db".to_string()),
            db_user: env::var("DB_USER").unwrap_or_else(|_| "autoverif_user".to_string()),
            db_pass: env::var("DB_PASS").unwrap_or_default(),
            db_pool_size: env::var("DB_POOL_SIZE")
                .unwrap_or_else(|_| "10".to_string())
                .parse()
                .unwrap_or(10),
            db_acquire_timeout_secs: env::var("DB_ACQUIRE_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .unwrap_or(30),
            server_host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            server_port: env::var("PORT")
                .or_else(|_| env::var("SERVER_PORT"))
                .unwrap_or_else(|_| "8930".to_string())
                .parse()
                .unwrap_or(8930),
            nhtsa_base: env::var("NHTSA_BASE")
                .unwrap_or_else(|_| "https://vpic.nhtsa.dot.gov/api".to_string()),
            nhtsa_recalls: env::var("NHTSA_RECALLS").unwrap_or_else(|_| {
                "https://api.nhtsa.gov/recalls/recallsByVehicle".to_string()
            }),
            nhtsa_complaints: env::var("NHTSA_COMPLAINTS").unwrap_or_else(|_| {
                "https://api.nhtsa.gov/complaints/complaintsByVehicle".to_string()
            }),
            nhtsa_ratings: env::var("NHTSA_RATINGS")
                .unwrap_or_else(|_| "https://api.nhtsa.gov/SafetyRatings".to_string()),
            epa_base: env::var("EPA_BASE")
                .unwrap_or_else(|_| "https://www.fueleconomy.gov/ws/rest".to_string()),
            tc_recalls: env::var("TC_RECALLS").unwrap_or_else(|_| {
                "https://data.tc.gc.ca/v1.3/api/eng/vehicle-recall-database".to_string()
            }),
            upload_dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "uploads".to_string()),
        })
    }

    /// Connection URL assembled from the DB_* parts; DATABASE_URL wins when set.
    pub fn database_url(&self) -> String {
        env::var("DATABASE_URL").unwrap_or_else(|_| {
            format!(
                "postgres://{}:{}@{}:{}/{}",
                self.db_user, self.db_pass, self.db_host, self.db_port, self.db_name
            )
        })
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

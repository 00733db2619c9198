// --- File: crates/services/studio_backend/src/app_state.rs ---
use std::sync::Arc;
use studio_common::{
    AppointmentStore, CalendarConfigStore, InMemoryAppointmentStore, InMemoryCalendarConfigStore,
    StudioError,
};
use studio_config::AppConfig;
#[allow(unused_imports)] // only used with certain features
use tracing::{info, warn};

#[cfg(feature = "gcal")]
use studio_gcal::GcalState;

/// Everything the routers need, wired once at startup.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub appointments: Arc<dyn AppointmentStore>,
    pub calendar_config: Arc<dyn CalendarConfigStore>,

    /// Google Calendar state, present when `use_gcal` is on and `[gcal]` is configured.
    #[cfg(feature = "gcal")]
    pub gcal_state: Option<Arc<GcalState>>,
}

type Stores = (Arc<dyn AppointmentStore>, Arc<dyn CalendarConfigStore>);

fn in_memory_stores() -> Stores {
    (
        Arc::new(InMemoryAppointmentStore::new()),
        Arc::new(InMemoryCalendarConfigStore::default()),
    )
}

#[cfg(feature = "database")]
async fn create_stores(config: &AppConfig) -> Result<Stores, StudioError> {
    match &config.database {
        Some(db_config) => {
            let (appointments, calendar_config) = studio_db::connect_and_migrate(db_config).await?;
            info!("Using SQL store at {}", db_config.url);
            Ok((Arc::new(appointments), Arc::new(calendar_config)))
        }
        None => {
            warn!("No [database] section; appointments are kept in memory only");
            Ok(in_memory_stores())
        }
    }
}

#[cfg(not(feature = "database"))]
async fn create_stores(config: &AppConfig) -> Result<Stores, StudioError> {
    if config.database.is_some() {
        warn!("Built without the database feature; ignoring [database]");
    }
    Ok(in_memory_stores())
}

impl AppState {
    /// Opens the stores and, when enabled, the Google Calendar clients.
    pub async fn new(config: Arc<AppConfig>) -> Result<Self, StudioError> {
        let (appointments, calendar_config) = create_stores(&config).await?;
        Self::with_stores(config, appointments, calendar_config)
    }

    pub fn with_stores(
        config: Arc<AppConfig>,
        appointments: Arc<dyn AppointmentStore>,
        calendar_config: Arc<dyn CalendarConfigStore>,
    ) -> Result<Self, StudioError> {
        #[cfg(feature = "gcal")]
        let gcal_state = match (config.use_gcal, config.gcal.as_ref()) {
            (true, Some(gcal_config)) => Some(Arc::new(GcalState::from_config(
                config.clone(),
                gcal_config,
                appointments.clone(),
                calendar_config.clone(),
            )?)),
            (true, None) => {
                warn!("use_gcal is set but [gcal] is missing; calendar sync disabled");
                None
            }
            (false, _) => None,
        };

        Ok(Self {
            config,
            appointments,
            calendar_config,
            #[cfg(feature = "gcal")]
            gcal_state,
        })
    }
}

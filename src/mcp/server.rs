//! Arcadia MCP Server Implementation
//!
//! Implements the MCP server with all Arcadia tools.

use std::path::PathBuf;
use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{
    CallToolResult, Content, Implementation, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::{schemars, tool, tool_handler, tool_router, ErrorData as McpError, ServerHandler};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::access::{Caller, IdentityProvider};
use crate::db::Database;
use crate::diet::{ActivityLevel, DietaryProfile, RuleSet};
use crate::models::{
    AnimalCreate, AnimalUpdate, DailyHealthCheckCreate, HabitatCreate, HabitatUpdate,
    HealthRecordCreate, VaccinationCreate,
};
use crate::tools::status::StatusTracker;
use crate::tools::{animals, feeding, habitats, health, reports, ToolError};

/// Arcadia MCP Service
#[derive(Clone)]
pub struct ArcadiaService {
    status_tracker: Arc<Mutex<StatusTracker>>,
    database: Database,
    identity: Arc<dyn IdentityProvider>,
    rules: Arc<RuleSet>,
    tool_router: ToolRouter<ArcadiaService>,
}

impl ArcadiaService {
    pub fn new(
        database_path: PathBuf,
        database: Database,
        identity: Arc<dyn IdentityProvider>,
        rules: RuleSet,
    ) -> Self {
        Self {
            status_tracker: Arc::new(Mutex::new(StatusTracker::new(database_path))),
            database,
            identity,
            rules: Arc::new(rules),
            tool_router: Self::tool_router(),
        }
    }

    fn caller(&self) -> Caller {
        self.identity.current_caller()
    }
}

/// Access denials are the client's problem; anything else is ours
fn tool_error(e: ToolError) -> McpError {
    match e {
        ToolError::Denied(e) => McpError::invalid_request(e.to_string(), None),
        ToolError::Failed(message) => McpError::internal_error(message, None),
    }
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(format!("Serialization error: {}", e), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

// ============================================================================
// Animal Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddAnimalParams {
    pub name: String,
    pub species: String,
    /// Kilograms
    pub weight: f64,
    /// Years; fractions allowed (0.5 = six months)
    pub age: f64,
    /// high, medium or low
    pub activity_level: Option<String>,
    /// Free text, e.g. "high protein diet"
    pub dietary_needs: Option<String>,
    /// Defaults to Healthy
    pub status: Option<String>,
    pub image: Option<String>,
    pub habitat_id: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AnimalIdParams {
    pub id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListAnimalsParams {
    pub habitat_id: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateAnimalParams {
    pub id: i64,
    pub name: Option<String>,
    pub species: Option<String>,
    pub image: Option<String>,
    pub status: Option<String>,
    pub age: Option<f64>,
    pub weight: Option<f64>,
    pub activity_level: Option<String>,
    /// Empty string clears the field
    pub dietary_needs: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct MoveAnimalParams {
    pub id: i64,
    /// Omit or null to take the animal out of any habitat
    pub habitat_id: Option<i64>,
}

// ============================================================================
// Habitat Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddHabitatParams {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct UpdateHabitatParams {
    pub id: i64,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CommentHabitatParams {
    pub id: i64,
    /// Omit or leave empty to clear the comment
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct HabitatIdParams {
    pub id: i64,
}

// ============================================================================
// Feeding Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AnimalFoodParams {
    pub animal_id: i64,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct PreviewFoodParams {
    pub species: String,
    /// Kilograms
    pub weight: f64,
    /// Years
    pub age: f64,
    #[serde(default = "default_activity")]
    pub activity_level: String,
    pub dietary_needs: Option<String>,
}

fn default_activity() -> String {
    ActivityLevel::Medium.as_str().to_string()
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct SetFoodQuantityParams {
    pub animal_id: i64,
    /// Grams per day
    pub grams: f64,
}

// ============================================================================
// Health Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddHealthRecordParams {
    pub animal_id: i64,
    /// YYYY-MM-DD
    pub date: String,
    pub status: String,
    pub food: String,
    /// Grams of food given
    pub quantity: f64,
    pub details: Option<String>,
    /// Kilograms
    pub weight: Option<f64>,
    /// Degrees Celsius
    pub temperature: Option<f64>,
    pub symptoms: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub medications: Option<String>,
    /// YYYY-MM-DD
    pub follow_up_date: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListHealthRecordsParams {
    /// Omit to list your own most recent records
    pub animal_id: Option<i64>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddVaccinationParams {
    pub animal_id: i64,
    pub vaccine_name: String,
    /// YYYY-MM-DD
    pub date_administered: String,
    /// YYYY-MM-DD
    pub expiration_date: Option<String>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListVaccinationsParams {
    /// Omit to list vaccinations you administered
    pub animal_id: Option<i64>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct AddDailyCheckParams {
    pub animal_id: i64,
    pub status: String,
    pub notes: String,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ListDailyChecksParams {
    /// YYYY-MM-DD, defaults to today
    pub date: Option<String>,
}

// ============================================================================
// Report Parameter Structs
// ============================================================================

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GenerateHealthReportParams {
    /// Where to write the PDF
    pub output_path: String,
}

// ============================================================================
// Tool Implementations
// ============================================================================

#[tool_router]
impl ArcadiaService {
    // --- Status ---

    #[tool(description = "Get the current status of the Arcadia service: build info, database, process, the caller's role and permissions, the active diet rules and a short usage guide")]
    async fn arcadia_status(&self) -> Result<CallToolResult, McpError> {
        let tracker = self.status_tracker.lock().await;
        let status = tracker.get_status(&self.caller(), &self.rules);
        json_result(&status)
    }

    // --- Animals ---

    #[tool(description = "Register a new animal (administrator or veterinarian)")]
    fn add_animal(&self, Parameters(p): Parameters<AddAnimalParams>) -> Result<CallToolResult, McpError> {
        let data = AnimalCreate {
            name: p.name,
            species: p.species,
            image: p.image.unwrap_or_default(),
            status: p.status.unwrap_or_default(),
            age: p.age,
            weight: p.weight,
            activity_level: p.activity_level.unwrap_or_default(),
            dietary_needs: p.dietary_needs,
            habitat_id: p.habitat_id,
        };
        let result = animals::add_animal(&self.database, &self.caller(), data).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Get full details for an animal")]
    fn get_animal(&self, Parameters(p): Parameters<AnimalIdParams>) -> Result<CallToolResult, McpError> {
        let result = animals::get_animal(&self.database, &self.caller(), p.id).map_err(tool_error)?;
        match result {
            Some(animal) => json_result(&animal),
            None => Ok(CallToolResult::success(vec![Content::text(format!(
                r#"{{"error": "Animal not found", "id": {}}}"#,
                p.id
            ))])),
        }
    }

    #[tool(description = "List animals, optionally only those in one habitat")]
    fn list_animals(&self, Parameters(p): Parameters<ListAnimalsParams>) -> Result<CallToolResult, McpError> {
        let result = animals::list_animals(&self.database, &self.caller(), p.habitat_id).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Update an animal's attributes (administrator or veterinarian)")]
    fn update_animal(&self, Parameters(p): Parameters<UpdateAnimalParams>) -> Result<CallToolResult, McpError> {
        let data = AnimalUpdate {
            name: p.name,
            species: p.species,
            image: p.image,
            status: p.status,
            age: p.age,
            weight: p.weight,
            activity_level: p.activity_level,
            dietary_needs: p.dietary_needs,
        };
        let result = animals::update_animal(&self.database, &self.caller(), p.id, data).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Move an animal to another habitat, or out of any habitat when habitat_id is omitted (administrator)")]
    fn move_animal(&self, Parameters(p): Parameters<MoveAnimalParams>) -> Result<CallToolResult, McpError> {
        let result = animals::move_animal(&self.database, &self.caller(), p.id, p.habitat_id).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Delete an animal and its health history (administrator or veterinarian)")]
    fn delete_animal(&self, Parameters(p): Parameters<AnimalIdParams>) -> Result<CallToolResult, McpError> {
        let result = animals::delete_animal(&self.database, &self.caller(), p.id).map_err(tool_error)?;
        json_result(&result)
    }

    // --- Habitats ---

    #[tool(description = "Create a habitat (administrator)")]
    fn add_habitat(&self, Parameters(p): Parameters<AddHabitatParams>) -> Result<CallToolResult, McpError> {
        let data = HabitatCreate { name: p.name, description: p.description, image: p.image };
        let result = habitats::add_habitat(&self.database, &self.caller(), data).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "List habitats with their animal counts and veterinarian comments")]
    fn list_habitats(&self) -> Result<CallToolResult, McpError> {
        let result = habitats::list_habitats(&self.database, &self.caller()).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Edit a habitat's name, description or image (administrator)")]
    fn update_habitat(&self, Parameters(p): Parameters<UpdateHabitatParams>) -> Result<CallToolResult, McpError> {
        let data = HabitatUpdate { name: p.name, description: p.description, image: p.image };
        let result = habitats::update_habitat(&self.database, &self.caller(), p.id, data).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Set or clear the veterinarian comment on a habitat (veterinarian)")]
    fn comment_habitat(&self, Parameters(p): Parameters<CommentHabitatParams>) -> Result<CallToolResult, McpError> {
        let result = habitats::comment_habitat(&self.database, &self.caller(), p.id, p.comment.as_deref())
            .map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Delete a habitat (administrator). Refused while animals live in it; the response lists them.")]
    fn delete_habitat(&self, Parameters(p): Parameters<HabitatIdParams>) -> Result<CallToolResult, McpError> {
        let result = habitats::delete_habitat(&self.database, &self.caller(), p.id).map_err(tool_error)?;
        match result {
            Ok(success) => json_result(&success),
            Err(blocked) => json_result(&blocked),
        }
    }

    // --- Feeding ---

    #[tool(description = "Recommended daily food for one animal: the computed grams with the factors that produced it, and any stored veterinarian override")]
    fn recommend_food(&self, Parameters(p): Parameters<AnimalFoodParams>) -> Result<CallToolResult, McpError> {
        let result = feeding::recommend_food(&self.database, &self.rules, &self.caller(), p.animal_id)
            .map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Recommended daily food for every animal, with totals")]
    fn list_food_recommendations(&self) -> Result<CallToolResult, McpError> {
        let result = feeding::list_food_recommendations(&self.database, &self.rules, &self.caller())
            .map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Compute a food recommendation for a profile that is not stored as an animal")]
    fn preview_food_recommendation(&self, Parameters(p): Parameters<PreviewFoodParams>) -> Result<CallToolResult, McpError> {
        let profile = DietaryProfile::new(p.species, p.weight, p.age, &p.activity_level, p.dietary_needs.as_deref());
        let result = feeding::preview_food_recommendation(&self.rules, &self.caller(), &profile).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Store a recommended food quantity in grams per day on an animal, overriding the computed value (veterinarian)")]
    fn set_recommended_food_quantity(&self, Parameters(p): Parameters<SetFoodQuantityParams>) -> Result<CallToolResult, McpError> {
        let result = feeding::set_recommended_food_quantity(&self.database, &self.rules, &self.caller(), p.animal_id, p.grams)
            .map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Remove the stored food quantity so the computed recommendation applies again (veterinarian)")]
    fn clear_recommended_food_quantity(&self, Parameters(p): Parameters<AnimalFoodParams>) -> Result<CallToolResult, McpError> {
        let result = feeding::clear_recommended_food_quantity(&self.database, &self.rules, &self.caller(), p.animal_id)
            .map_err(tool_error)?;
        json_result(&result)
    }

    // --- Health ---

    #[tool(description = "Write a health record (visit report) for an animal (veterinarian)")]
    fn add_health_record(&self, Parameters(p): Parameters<AddHealthRecordParams>) -> Result<CallToolResult, McpError> {
        let data = HealthRecordCreate {
            animal_id: p.animal_id,
            date: p.date,
            status: p.status,
            food: p.food,
            quantity: p.quantity,
            details: p.details,
            weight: p.weight,
            temperature: p.temperature,
            symptoms: p.symptoms,
            diagnosis: p.diagnosis,
            treatment: p.treatment,
            medications: p.medications,
            follow_up_date: p.follow_up_date,
            veterinarian_id: 0,
        };
        let result = health::add_health_record(&self.database, &self.caller(), data).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "List health records for one animal, or your own most recent records when animal_id is omitted")]
    fn list_health_records(&self, Parameters(p): Parameters<ListHealthRecordsParams>) -> Result<CallToolResult, McpError> {
        let result = health::list_health_records(&self.database, &self.caller(), p.animal_id, p.limit)
            .map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Record a vaccination (veterinarian)")]
    fn add_vaccination(&self, Parameters(p): Parameters<AddVaccinationParams>) -> Result<CallToolResult, McpError> {
        let data = VaccinationCreate {
            animal_id: p.animal_id,
            vaccine_name: p.vaccine_name,
            date_administered: p.date_administered,
            expiration_date: p.expiration_date,
            veterinarian_id: 0,
        };
        let result = health::add_vaccination(&self.database, &self.caller(), data).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "List vaccinations for one animal, or those you administered when animal_id is omitted")]
    fn list_vaccinations(&self, Parameters(p): Parameters<ListVaccinationsParams>) -> Result<CallToolResult, McpError> {
        let result = health::list_vaccinations(&self.database, &self.caller(), p.animal_id).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Record today's daily health check for an animal (veterinarian)")]
    fn add_daily_health_check(&self, Parameters(p): Parameters<AddDailyCheckParams>) -> Result<CallToolResult, McpError> {
        let data = DailyHealthCheckCreate {
            animal_id: p.animal_id,
            status: p.status,
            notes: p.notes,
            veterinarian_id: 0,
        };
        let result = health::add_daily_health_check(&self.database, &self.caller(), data).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "List your daily health checks for a day (defaults to today)")]
    fn list_daily_health_checks(&self, Parameters(p): Parameters<ListDailyChecksParams>) -> Result<CallToolResult, McpError> {
        let result = health::list_daily_health_checks(&self.database, &self.caller(), p.date.as_deref())
            .map_err(tool_error)?;
        json_result(&result)
    }

    // --- Reports ---

    #[tool(description = "Number of animals per health status")]
    fn health_status_report(&self) -> Result<CallToolResult, McpError> {
        let result = reports::health_status_report(&self.database, &self.caller()).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Vaccinated and not vaccinated animals per species")]
    fn vaccination_report(&self) -> Result<CallToolResult, McpError> {
        let result = reports::vaccination_report(&self.database, &self.caller()).map_err(tool_error)?;
        json_result(&result)
    }

    #[tool(description = "Generate a PDF report with health status and vaccination coverage tables and bar charts")]
    fn generate_health_report(&self, Parameters(p): Parameters<GenerateHealthReportParams>) -> Result<CallToolResult, McpError> {
        let result = reports::generate_health_report(&self.database, &self.caller(), &p.output_path)
            .map_err(tool_error)?;
        json_result(&result)
    }
}

// ============================================================================
// Server Handler
// ============================================================================

#[tool_handler]
impl ServerHandler for ArcadiaService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: "arcadia".into(),
                version: crate::build_info::VERSION.into(),
                title: Some("Arcadia Zoo Manager".into()),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Arcadia Zoo Manager - animal care, feeding and veterinary records. \
                 Call arcadia_status first to see your role, permissions and the usage guide. \
                 Animals: add/get/list/update/move/delete_animal. \
                 Habitats: add/list/update/delete_habitat, comment_habitat. \
                 Feeding: recommend_food, list_food_recommendations, preview_food_recommendation, \
                 set/clear_recommended_food_quantity (veterinarian only). \
                 Health: add/list_health_records, add/list_vaccinations, add/list_daily_health_checks. \
                 Reports: health_status_report, vaccination_report, generate_health_report (PDF)."
                    .into(),
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::{AccessError, Permission, Role, StaticIdentity};
    use rmcp::model::ErrorCode;

    fn service(role: Role) -> ArcadiaService {
        let identity = Arc::new(StaticIdentity::new(Caller::new(Some(1), role)));
        ArcadiaService::new(
            PathBuf::from(":memory:"),
            Database::in_memory().unwrap(),
            identity,
            RuleSet::default(),
        )
    }

    #[test]
    fn test_denials_are_invalid_requests() {
        let denied = tool_error(ToolError::Denied(AccessError::Forbidden {
            role: Role::Visitor,
            permission: Permission::ManageHabitats,
        }));
        assert_eq!(denied.code, ErrorCode::INVALID_REQUEST);

        let failed = tool_error(ToolError::Failed("Database error: locked".to_string()));
        assert_eq!(failed.code, ErrorCode::INTERNAL_ERROR);
    }

    #[test]
    fn test_preview_params_default_to_medium_activity() {
        let params: PreviewFoodParams =
            serde_json::from_str(r#"{"species": "Zebra", "weight": 350.0, "age": 7.0}"#).unwrap();
        assert_eq!(params.activity_level, "medium");
        assert!(params.dietary_needs.is_none());
    }

    #[test]
    fn test_caller_comes_from_identity() {
        let vet = service(Role::Veterinarian);
        assert_eq!(vet.caller().role, Role::Veterinarian);
        assert!(vet.list_food_recommendations().is_ok());

        let visitor = service(Role::Visitor);
        let err = visitor.list_food_recommendations().unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_REQUEST);
        assert!(visitor.list_habitats().is_ok());
    }

    #[test]
    fn test_server_info() {
        let info = service(Role::Anonymous).get_info();
        assert_eq!(info.server_info.name, "arcadia");
        assert!(info.capabilities.tools.is_some());
    }
}

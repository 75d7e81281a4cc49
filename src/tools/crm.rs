use serde::{ Deserialize, Serialize };

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PlanRecord {
    #[serde(rename = "PlanID")]
    pub plan_id: String,
    pub plan_name: String,
    pub plan_type: String,
    pub plan_status: String,
    #[serde(rename = "PlanSystemTypeID")]
    pub plan_system_type_id: String,
    #[serde(rename = "BenefitPlanID")]
    pub benefit_plan_id: String,
    pub date_of_service: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrmPayload {
    pub plan: PlanRecord,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerRecord {
    pub id: String,
    pub crm: CrmPayload,
}

/// Customer record lookup. Until a CRM integration exists every caller gets
/// the same sample plan.
#[derive(Clone, Debug, Default)]
pub struct CrmService;

impl CrmService {
    pub fn new() -> Self {
        Self
    }

    pub fn customer_record(&self) -> CustomerRecord {
        CustomerRecord {
            id: "123e4567-e89b-12d3-a456-426614174000".to_string(),
            crm: CrmPayload {
                plan: PlanRecord {
                    plan_id: "123456789".to_string(),
                    plan_name: "Premium Health Plan".to_string(),
                    plan_type: "PHP".to_string(),
                    plan_status: "ACTIVE".to_string(),
                    plan_system_type_id: "COSMOS".to_string(),
                    benefit_plan_id: "123456789_PHP".to_string(),
                    date_of_service: "20241001".to_string(),
                },
            },
        }
    }
}

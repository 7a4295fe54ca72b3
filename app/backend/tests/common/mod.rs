//! FILENAME: tests/common/mod.rs
//! Test harness and fixtures for backend integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use app_lib::{create_app_state_with_source, AppSettings, AppState};
use connector::{decode_bundles, ConfigBundle, StaticConfigSource};
use serde_json::json;

/// Test harness holding app state over an in-memory bundle source.
pub struct TestHarness {
    pub state: AppState,
    pub source: Arc<StaticConfigSource>,
}

impl TestHarness {
    /// Empty source, default settings.
    pub fn new() -> Self {
        Self::with_settings(AppSettings::default(), Vec::new())
    }

    pub fn with_settings(mut settings: AppSettings, bundles: Vec<ConfigBundle>) -> Self {
        if settings.owner_id.is_empty() {
            settings.owner_id = "001OWNER".to_string();
        }
        let source = Arc::new(StaticConfigSource::new(bundles));
        TestHarness {
            state: create_app_state_with_source(settings, source.clone()),
            source,
        }
    }

    /// Two configurations: sales (Amount summed, Region as bar) and
    /// contacts (City as donut, Age averaged).
    pub fn with_sample_configs() -> Self {
        Self::with_settings(AppSettings::default(), sample_bundles())
    }

    pub fn with_column_toggle_denied() -> Self {
        let settings = AppSettings {
            allow_column_toggle: false,
            ..Default::default()
        };
        Self::with_settings(settings, sample_bundles())
    }

    pub fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap()
    }
}

pub fn sample_bundles() -> Vec<ConfigBundle> {
    decode_bundles(json!([
        {
            "configId": "cfg-sales",
            "configName": "Sales",
            "connectionName": "ERP",
            "data": [
                {"Name": "A", "Amount": "10", "Region": "North"},
                {"Name": "B", "Amount": "20", "Region": ""},
                {"Name": "C", "Amount": "abc", "Region": "North"}
            ],
            "mappingFields": [
                {"JisrTest__Field_JSON_Path__c": "$.amount", "JisrTest__Field_Label__c": "Amount", "JisrTest__Report_Type__c": "SUM"},
                {"JisrTest__Field_JSON_Path__c": "$.region", "JisrTest__Field_Label__c": "Region", "JisrTest__Report_Type__c": "Group By - Bar"}
            ]
        },
        {
            "configId": "cfg-contacts",
            "configName": "Contacts",
            "data": [
                {"Name": "X", "City": "Paris", "Age": 30},
                {"Name": "Y", "City": "Lyon", "Age": 40},
                {"Name": "Z", "City": "Paris", "Age": null}
            ],
            "mappingFields": [
                {"Field_JSON_Path__c": "$.city", "Field_Label__c": "City", "Report_Type__c": "Group By - donut"},
                {"Field_JSON_Path__c": "$.age", "Field_Label__c": "Age", "Report_Type__c": "Average"}
            ]
        }
    ]))
    .unwrap()
}

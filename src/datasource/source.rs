//! REST-backed entity source
//!
//! Turns a [`DataSourceDef`] endpoint into the get-by-id / search / list
//! calls the resolver drives.

use super::flatten::extract_json_value;
use super::registry::{fill_path, DataSourceDef, NameLookup};
use super::resolver::{find_in_list, key_text, Capabilities, EntitySource};
use crate::zpa::{ApiError, ZpaClient};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;

/// Query parameter for server-side name search
pub const SEARCH_PARAM: &str = "search";

pub struct RestEntitySource<'a> {
    def: &'a DataSourceDef,
    client: ZpaClient,
    path_values: HashMap<String, String>,
    query: Vec<(String, String)>,
    matches: Vec<(String, String)>,
}

impl<'a> RestEntitySource<'a> {
    pub fn new(def: &'a DataSourceDef, client: ZpaClient) -> Self {
        Self {
            def,
            client,
            path_values: HashMap::new(),
            query: Vec::new(),
            matches: Vec::new(),
        }
    }

    /// Value for a `{key}` placeholder of the endpoint path
    pub fn with_path_value(mut self, key: &str, value: &str) -> Self {
        self.path_values.insert(key.to_string(), value.to_string());
        self
    }

    /// Query parameter sent with listings and singleton reads
    pub fn with_query(mut self, key: &str, value: &str) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Keep only listed entities whose `field` equals `value`
    pub fn with_match(mut self, field: &str, value: &str) -> Self {
        self.matches.push((field.to_string(), value.to_string()));
        self
    }

    fn client_for(&self, scope: Option<&str>) -> ZpaClient {
        match scope {
            Some(microtenant_id) => self.client.with_microtenant(microtenant_id),
            None => self.client.clone(),
        }
    }

    pub fn collection_url(&self) -> String {
        let path = fill_path(&self.def.endpoint.path, &self.path_values);
        self.client.api_url(self.def.endpoint.api, &path)
    }

    pub fn item_url(&self, id: &str) -> String {
        let path = fill_path(self.def.endpoint.item_path(), &self.path_values);
        format!(
            "{}/{}",
            self.client.api_url(self.def.endpoint.api, &path),
            urlencoding::encode(id)
        )
    }

    /// Flatten nested listings (e.g. controls grouped under control groups)
    fn unnest(&self, items: Vec<Value>) -> Vec<Value> {
        let Some(list_path) = self.def.endpoint.list_path.as_deref() else {
            return items;
        };

        items
            .into_iter()
            .flat_map(|mut item| match item.get_mut(list_path).map(Value::take) {
                Some(Value::Array(children)) => children,
                _ => Vec::new(),
            })
            .collect()
    }

    fn matches(&self, entity: &Value) -> bool {
        self.matches.iter().all(|(field, wanted)| {
            extract_json_value(entity, field)
                .and_then(key_text)
                .as_deref()
                == Some(wanted.as_str())
        })
    }

    /// Unnest a listing and drop entities failing a match
    fn select(&self, items: Vec<Value>) -> Vec<Value> {
        let mut items = self.unnest(items);
        if !self.matches.is_empty() {
            items.retain(|entity| self.matches(entity));
        }
        items
    }

    /// Read the single document of a singleton endpoint
    pub async fn fetch_one(&self, scope: Option<&str>) -> Result<Value, ApiError> {
        let url = self.collection_url();
        tracing::debug!("Fetching {} from {}", self.def.label, url);
        self.client_for(scope).get(&url, &self.query).await
    }
}

#[async_trait]
impl EntitySource for RestEntitySource<'_> {
    fn label(&self) -> &str {
        &self.def.label
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            get_by_id: self.def.lookup.get_by_id,
            get_by_name: self.def.lookup.get_by_name == NameLookup::Search,
        }
    }

    fn id_field(&self) -> &str {
        &self.def.id_field
    }

    fn name_field(&self) -> &str {
        &self.def.name_field
    }

    async fn get_by_id(&self, id: &str, scope: Option<&str>) -> Result<Option<Value>, ApiError> {
        let entity = self.client_for(scope).get(&self.item_url(id), &[]).await?;
        Ok(Some(entity).filter(|e| !e.is_null()))
    }

    async fn get_by_name(
        &self,
        name: &str,
        scope: Option<&str>,
    ) -> Result<Option<Value>, ApiError> {
        let mut query = self.query.clone();
        query.push((SEARCH_PARAM.to_string(), name.to_string()));

        let items = self
            .client_for(scope)
            .get_all_pages(&self.collection_url(), &query)
            .await?;

        // search matches substrings; keep only an exact (case-insensitive) hit
        Ok(find_in_list(
            self.select(items),
            None,
            Some(name),
            &self.def.id_field,
            &self.def.name_field,
        ))
    }

    async fn list_all(&self, scope: Option<&str>) -> Result<Vec<Value>, ApiError> {
        let items = self
            .client_for(scope)
            .get_all_pages(&self.collection_url(), &self.query)
            .await?;
        Ok(self.select(items))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResolvedConfig;
    use crate::datasource::registry::{get_data_source, PARENT_PLACEHOLDER};
    use serde_json::json;

    fn client() -> ZpaClient {
        let config = ResolvedConfig {
            client_id: "id".into(),
            client_secret: "secret".into(),
            customer_id: "42".into(),
            base_url: "https://zpa.test".into(),
            microtenant_id: None,
        };
        ZpaClient::new(&config, "zpa-lookup-test").unwrap()
    }

    #[test]
    fn test_item_url_uses_get_path() {
        let def = get_data_source("scim_groups").unwrap();
        let source = RestEntitySource::new(def, client()).with_path_value(PARENT_PLACEHOLDER, "7");
        assert_eq!(
            source.collection_url(),
            "https://zpa.test/userconfig/v1/customers/42/scimgroup/idpId/7"
        );
        assert_eq!(
            source.item_url("99"),
            "https://zpa.test/userconfig/v1/customers/42/scimgroup/99"
        );
    }

    #[test]
    fn test_capabilities_follow_definition() {
        let source = RestEntitySource::new(get_data_source("segment_group").unwrap(), client());
        assert_eq!(source.capabilities(), Capabilities::ALL);

        let source =
            RestEntitySource::new(get_data_source("cloud_browser_isolation_region").unwrap(), client());
        assert_eq!(source.capabilities(), Capabilities::LIST_ONLY);
    }

    #[test]
    fn test_unnest_nested_listing() {
        let def = get_data_source("inspection_predefined_controls").unwrap();
        let source = RestEntitySource::new(def, client());
        let groups = vec![
            json!({"controlGroup": "a", "predefinedInspectionControls": [{"id": "1"}, {"id": "2"}]}),
            json!({"controlGroup": "b"}),
            json!({"controlGroup": "c", "predefinedInspectionControls": [{"id": "3"}]}),
        ];
        let ids: Vec<Value> = source
            .unnest(groups)
            .into_iter()
            .map(|c| c["id"].clone())
            .collect();
        assert_eq!(ids, vec![json!("1"), json!("2"), json!("3")]);
    }

    #[test]
    fn test_select_applies_matches() {
        let def = get_data_source("inspection_predefined_controls").unwrap();
        let source = RestEntitySource::new(def, client()).with_match("version", "OWASP_CRS/4.0");
        let groups = vec![json!({"predefinedInspectionControls": [
            {"id": "1", "name": "Scanner Detection", "version": "OWASP_CRS/3.3.0"},
            {"id": "2", "name": "Scanner Detection", "version": "OWASP_CRS/4.0"},
            {"id": "3", "name": "Protocol Issues"},
        ]})];
        let selected = source.select(groups);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0]["id"], "2");
    }
}

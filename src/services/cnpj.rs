//! Public CNPJ registry lookup (BrasilAPI-compatible).

use std::time::Duration;

use anyhow::Context;
use moka::future::Cache;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use utoipa::ToSchema;

use crate::error::{ApiError, ApiResult};
use crate::model::company::TaxRegime;
use crate::utils::br_docs::Cnpj;

const CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const CACHE_CAPACITY: u64 = 10_000;

#[derive(Clone)]
pub struct CnpjClient {
    http: Client,
    base_url: String,
    cache: Cache<String, CompanyLookup>,
}

/// Registry record as returned by the public API.
#[derive(Debug, Deserialize)]
struct RegistryRecord {
    cnpj: String,
    razao_social: String,
    nome_fantasia: Option<String>,
    descricao_situacao_cadastral: Option<String>,
    municipio: Option<String>,
    uf: Option<String>,
    email: Option<String>,
    ddd_telefone_1: Option<String>,
    opcao_pelo_simples: Option<bool>,
    opcao_pelo_mei: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct CompanyLookup {
    #[schema(example = "11222333000181")]
    pub cnpj: String,
    pub legal_name: String,
    pub trade_name: Option<String>,
    #[schema(example = "ATIVA")]
    pub registration_status: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub suggested_tax_regime: Option<TaxRegime>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl From<RegistryRecord> for CompanyLookup {
    fn from(r: RegistryRecord) -> Self {
        let suggested_tax_regime = match (r.opcao_pelo_mei, r.opcao_pelo_simples) {
            (Some(true), _) => Some(TaxRegime::Mei),
            (_, Some(true)) => Some(TaxRegime::SimplesNacional),
            _ => None,
        };
        Self {
            cnpj: r.cnpj,
            legal_name: r.razao_social,
            trade_name: non_blank(r.nome_fantasia),
            registration_status: non_blank(r.descricao_situacao_cadastral),
            city: non_blank(r.municipio),
            state: non_blank(r.uf),
            email: non_blank(r.email).map(|e| e.to_lowercase()),
            phone: non_blank(r.ddd_telefone_1),
            suggested_tax_regime,
        }
    }
}

impl CnpjClient {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build CNPJ http client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            cache: Cache::builder()
                .max_capacity(CACHE_CAPACITY)
                .time_to_live(CACHE_TTL)
                .build(),
        })
    }

    pub async fn lookup(&self, cnpj: &Cnpj) -> ApiResult<CompanyLookup> {
        let key = cnpj.digits().to_string();
        if let Some(hit) = self.cache.get(&key).await {
            debug!(cnpj = %key, "CNPJ cache hit");
            return Ok(hit);
        }

        let url = format!("{}/{}", self.base_url, key);
        let response = self.http.get(&url).send().await.map_err(|e| {
            warn!(error = %e, cnpj = %key, "CNPJ lookup request failed");
            ApiError::Upstream(e.to_string())
        })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => {
                return Err(ApiError::not_found("CNPJ not found in the public registry"));
            }
            status => return Err(ApiError::Upstream(format!("registry answered {status}"))),
        }

        let record: RegistryRecord = response
            .json()
            .await
            .map_err(|e| ApiError::Upstream(format!("unexpected registry payload: {e}")))?;

        let lookup = CompanyLookup::from(record);
        self.cache.insert(key, lookup.clone()).await;
        Ok(lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(json: serde_json::Value) -> CompanyLookup {
        serde_json::from_value::<RegistryRecord>(json).unwrap().into()
    }

    #[test]
    fn maps_registry_fields() {
        let lookup = record(serde_json::json!({
            "cnpj": "11222333000181",
            "razao_social": "PADARIA PAO QUENTE LTDA",
            "nome_fantasia": "",
            "descricao_situacao_cadastral": "ATIVA",
            "municipio": "SAO PAULO",
            "uf": "SP",
            "email": "RH@PAOQUENTE.COM.BR",
            "ddd_telefone_1": "1133334444",
            "opcao_pelo_simples": true,
            "opcao_pelo_mei": false,
            "capital_social": 50000
        }));

        assert_eq!(lookup.legal_name, "PADARIA PAO QUENTE LTDA");
        assert_eq!(lookup.trade_name, None);
        assert_eq!(lookup.registration_status.as_deref(), Some("ATIVA"));
        assert_eq!(lookup.email.as_deref(), Some("rh@paoquente.com.br"));
        assert_eq!(lookup.suggested_tax_regime, Some(TaxRegime::SimplesNacional));
    }

    #[test]
    fn mei_wins_over_simples_and_missing_flags_suggest_nothing() {
        let mei = record(serde_json::json!({
            "cnpj": "11222333000181",
            "razao_social": "JOAO MEI",
            "opcao_pelo_simples": true,
            "opcao_pelo_mei": true
        }));
        assert_eq!(mei.suggested_tax_regime, Some(TaxRegime::Mei));

        let big = record(serde_json::json!({
            "cnpj": "00000000000191",
            "razao_social": "BANCO DO BRASIL SA",
            "opcao_pelo_simples": null
        }));
        assert_eq!(big.suggested_tax_regime, None);
    }

    #[actix_web::test]
    async fn cached_entries_skip_the_network() {
        let client = CnpjClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let cnpj = Cnpj::parse("11.222.333/0001-81").unwrap();
        let cached = record(serde_json::json!({
            "cnpj": "11222333000181",
            "razao_social": "PADARIA PAO QUENTE LTDA"
        }));
        client.cache.insert(cnpj.digits().to_string(), cached.clone()).await;

        assert_eq!(client.lookup(&cnpj).await.unwrap(), cached);
    }

    #[actix_web::test]
    async fn unreachable_registry_is_an_upstream_error() {
        let client = CnpjClient::new("http://127.0.0.1:9", Duration::from_millis(200)).unwrap();
        let cnpj = Cnpj::parse("00.000.000/0001-91").unwrap();
        let err = client.lookup(&cnpj).await.unwrap_err();
        assert!(matches!(err, ApiError::Upstream(_)));
    }
}

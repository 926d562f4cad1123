//! 位置 / 网络描述：ip-api.com 尽力查询，失败时返回错误文本

use std::time::Duration;

use serde::Deserialize;

const IP_API: &str = "http://ip-api.com/json/";

#[derive(Deserialize, Default)]
#[serde(default)]
struct IpApiResponse {
    status: String,
    message: Option<String>,
    city: String,
    #[serde(rename = "regionName")]
    region_name: String,
    country: String,
    timezone: String,
    isp: String,
}

fn describe_response(data: &IpApiResponse) -> String {
    if data.status != "success" {
        return format!(
            "Geolocation failed: {}",
            data.message.as_deref().unwrap_or("Unknown error")
        );
    }
    format!(
        "City: {}\nRegion: {}\nCountry: {}\nTimezone: {}\nISP: {}",
        data.city, data.region_name, data.country, data.timezone, data.isp
    )
}

/// 查询当前位置描述
pub async fn describe(timeout_secs: u64) -> String {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .unwrap_or_default();
    let result = async {
        client
            .get(IP_API)
            .send()
            .await?
            .error_for_status()?
            .json::<IpApiResponse>()
            .await
    }
    .await;
    match result {
        Ok(data) => describe_response(&data),
        Err(e) => {
            tracing::debug!("Geolocation error: {}", e);
            format!("Error retrieving location: {}", e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_success_and_failure() {
        let ok: IpApiResponse = serde_json::from_str(
            r#"{"status":"success","city":"Lisbon","regionName":"Lisboa","country":"Portugal","timezone":"Europe/Lisbon","isp":"MEO"}"#,
        )
        .unwrap();
        let text = describe_response(&ok);
        assert!(text.starts_with("City: Lisbon\nRegion: Lisboa"));

        let fail: IpApiResponse =
            serde_json::from_str(r#"{"status":"fail","message":"private range"}"#).unwrap();
        assert_eq!(describe_response(&fail), "Geolocation failed: private range");
    }
}

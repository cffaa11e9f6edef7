//! Machine image checks through the EC2 API

use crate::error::{AwsError, Result};
use aws_config::BehaviorVersion;
use aws_sdk_ec2::config::Region;
use aws_sdk_ec2::error::{DisplayErrorContext, ProvideErrorMetadata};
use std::collections::BTreeSet;

const NOT_FOUND_CODES: [&str; 2] = ["InvalidAMIID.NotFound", "InvalidAMIID.Malformed"];

/// Image ids a template resolves to in `region`
///
/// Reads every `Mappings` table whose row for `region` carries an `ami`
/// entry; those are the tables instances look their image up in.
pub fn images_for_region(template: &serde_json::Value, region: &str) -> Vec<String> {
    let Some(mappings) = template.get("Mappings").and_then(|m| m.as_object()) else {
        return Vec::new();
    };
    let ids: BTreeSet<String> = mappings
        .values()
        .filter_map(|table| table.get(region))
        .filter_map(|row| row.get("ami"))
        .filter_map(|ami| ami.as_str())
        .map(|ami| ami.to_string())
        .collect();
    ids.into_iter().collect()
}

/// Every region a template has an image for
pub fn mapped_regions(template: &serde_json::Value) -> BTreeSet<String> {
    template
        .get("Mappings")
        .and_then(|m| m.as_object())
        .map(|mappings| {
            mappings
                .values()
                .filter_map(|table| table.as_object())
                .flat_map(|table| table.keys().cloned())
                .collect()
        })
        .unwrap_or_default()
}

pub struct ImageChecker {
    client: aws_sdk_ec2::Client,
    region: String,
}

impl ImageChecker {
    pub async fn new(region: &str, profile: Option<&str>) -> Self {
        let mut loader =
            aws_config::defaults(BehaviorVersion::latest()).region(Region::new(region.to_string()));
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let config = loader.load().await;
        Self {
            client: aws_sdk_ec2::Client::new(&config),
            region: region.to_string(),
        }
    }

    /// Whether `image_id` exists and is visible to the caller
    pub async fn exists(&self, image_id: &str) -> Result<bool> {
        tracing::debug!("Describing image {} in {}", image_id, self.region);

        match self
            .client
            .describe_images()
            .image_ids(image_id)
            .send()
            .await
        {
            Ok(output) => Ok(output
                .images()
                .iter()
                .any(|image| image.image_id() == Some(image_id))),
            Err(err)
                if err
                    .as_service_error()
                    .and_then(|e| e.code())
                    .is_some_and(|c| NOT_FOUND_CODES.contains(&c)) =>
            {
                Ok(false)
            }
            Err(err) => Err(AwsError::Ec2(DisplayErrorContext(&err).to_string())),
        }
    }

    /// Ids from `image_ids` that do not exist in the region
    pub async fn missing(&self, image_ids: &[String]) -> Result<Vec<String>> {
        let mut missing = Vec::new();
        for image_id in image_ids {
            if !self.exists(image_id).await? {
                missing.push(image_id.clone());
            }
        }
        Ok(missing)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template() -> serde_json::Value {
        json!({
            "Mappings": {
                "MyEC2Instance1AmiMap": {
                    "us-east-1": { "ami": "ami-0ba8562d785e35387" },
                    "us-west-2": { "ami": "ami-0123456789abcdef0" }
                }
            },
            "Resources": {}
        })
    }

    #[test]
    fn test_images_for_region() {
        assert_eq!(
            images_for_region(&template(), "us-east-1"),
            vec!["ami-0ba8562d785e35387"]
        );
        assert!(images_for_region(&template(), "eu-west-1").is_empty());
        assert!(images_for_region(&json!({}), "us-east-1").is_empty());
    }

    #[test]
    fn test_mapped_regions() {
        let regions = mapped_regions(&template());
        assert_eq!(
            regions.into_iter().collect::<Vec<_>>(),
            vec!["us-east-1", "us-west-2"]
        );
    }
}

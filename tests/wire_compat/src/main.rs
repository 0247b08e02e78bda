fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use vaultup_protocol::headers::upload_headers;
    use vaultup_protocol::messages::{
        BeginTransactionResponse, DiscoveryDocument, OpenIdConfiguration, TokenResponse,
        parse_embedded_json,
    };
    use vaultup_protocol::{
        CommitBody, CommitResult, ContentId, FileItem, TransactionId, commit_boundary,
    };

    const CONTENT_ID: &str = "0123456789AB4DEF8123456789ABCDEF";
    const TRANSACTION_ID: &str = "9F2C1B7D4E5A46B8A1C3D5E7F9012345";

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    fn load_text(name: &str) -> String {
        let path = fixtures_dir().join(name);
        fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()))
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        serde_json::from_str(&load_text(name))
            .unwrap_or_else(|e| panic!("failed to parse fixture {name}: {e}"))
    }

    fn parse_fixture<T: serde::de::DeserializeOwned>(name: &str) -> T {
        serde_json::from_value(load_fixture(name))
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"))
    }

    /// Deserializes a fixture, re-serializes it and compares the JSON values.
    /// Only valid for documents without fields the client ignores.
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));
        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  server: {fixture}\n  client: {reserialized}"
        );
    }

    // --- Token exchange ---

    #[test]
    fn fixture_discovery() {
        let doc: DiscoveryDocument = parse_fixture("discovery.json");
        assert_eq!(
            doc.provider_uri(),
            Some("http://localhost/InnovatorServer/OAuthServer/")
        );
    }

    #[test]
    fn fixture_openid_configuration_ignores_extra_fields() {
        let config: OpenIdConfiguration = parse_fixture("openid_configuration.json");
        assert_eq!(
            config.token_endpoint.as_deref(),
            Some("http://localhost/InnovatorServer/OAuthServer/connect/token")
        );
    }

    #[test]
    fn fixture_token_response() {
        roundtrip_test::<TokenResponse>("token_response.json");
        let token: TokenResponse = parse_fixture("token_response.json");
        assert_eq!(token.expires_in, Some(3600));
    }

    // --- Transaction ---

    #[test]
    fn fixture_begin_transaction() {
        roundtrip_test::<BeginTransactionResponse>("begin_transaction.json");
        let resp: BeginTransactionResponse = parse_fixture("begin_transaction.json");
        assert_eq!(resp.transaction_id.as_deref(), Some(TRANSACTION_ID));
    }

    #[test]
    fn fixture_upload_headers() {
        let expected: Vec<(String, String)> = parse_fixture("upload_headers.json");
        let headers = upload_headers(
            "Q3 report (final).pdf",
            10_000,
            19_999,
            25_000,
            &TransactionId::new(TRANSACTION_ID),
        );
        let actual: Vec<(String, String)> = headers
            .iter()
            .map(|h| (h.name.clone(), h.value.clone()))
            .collect();
        assert_eq!(actual, expected);
    }

    #[test]
    fn fixture_file_item_is_byte_exact() {
        let id = ContentId::parse(CONTENT_ID).unwrap();
        let item = FileItem::new(&id, "report.pdf", 25_000);
        let json = serde_json::to_string(&item).unwrap();
        assert_eq!(json, load_text("file_item.json").trim_end());
        roundtrip_test::<FileItem>("file_item.json");
    }

    #[test]
    fn fixture_commit_body_is_byte_exact() {
        let id = ContentId::parse(CONTENT_ID).unwrap();
        let boundary = commit_boundary(&id);
        let body = CommitBody {
            boundary: &boundary,
            server_url: "http://localhost/InnovatorServer",
            content_id: &id,
            file_name: "report.pdf",
            file_size: 25_000,
        }
        .build();

        let expected = fs::read(fixtures_dir().join("commit_body.txt")).unwrap();
        assert_eq!(
            String::from_utf8(body).unwrap(),
            String::from_utf8(expected).unwrap()
        );
    }

    #[test]
    fn fixture_commit_result_plain_json() {
        let result: CommitResult = parse_embedded_json(&load_text("commit_result.json")).unwrap();
        assert_eq!(result.id, CONTENT_ID);
        assert_eq!(result.filename, "report.pdf");
    }

    #[test]
    fn fixture_commit_result_in_multipart_response() {
        let result: CommitResult =
            parse_embedded_json(&load_text("commit_response_multipart.txt")).unwrap();
        assert_eq!(
            result,
            CommitResult {
                id: CONTENT_ID.into(),
                filename: "report.pdf".into(),
            }
        );
    }
}

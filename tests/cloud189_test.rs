//! 189 网盘：签名握手、XML 响应、大整数 id、分页

mod common;

use serde_json::json;

use common::{query_param, respond, respond_json, state_with, MockTransport};
use rapid_manifest::http::{HttpRequest, HttpResponse};
use rapid_manifest::rapid::sign::{sign, CLOUD189_APP_KEY};
use rapid_manifest::rapid::{self, ProviderId};
use rapid_manifest::ShareError;

const SHARE_URL: &str = "https://cloud.189.cn/t/ZnUNfa";
const SHARE_ID: &str = "9876543210123456789";
const ROOT_ID: &str = "424803211905070152";
const SUB_ID: &str = "424803211905070153";

fn share_info_ok() -> Result<HttpResponse, ShareError> {
    // 大整数 id 以数字形式返回
    respond(
        200,
        format!(
            r#"{{"res_code":0,"res_message":"成功","shareId":{},"fileId":{},"shareMode":1,"isFolder":true,"needAccessCode":1}}"#,
            SHARE_ID, ROOT_ID
        ),
    )
}

fn assert_signed(request: &HttpRequest, access_code: &str) {
    let timestamp = request.header_value("Timestamp").expect("Timestamp header");
    assert!(timestamp.parse::<u64>().is_ok());
    assert_eq!(request.header_value("AppKey"), Some(CLOUD189_APP_KEY));
    assert_eq!(request.header_value("Sign-Type"), Some("1"));

    let expected = sign(&[
        ("shareCode", "ZnUNfa"),
        ("accessCode", access_code),
        ("Timestamp", timestamp),
        ("AppKey", CLOUD189_APP_KEY),
    ]);
    assert_eq!(request.header_value("Signature"), Some(expected.as_str()));

    // Timestamp / AppKey 只参与签名，不出现在查询参数里
    assert_eq!(query_param(&request.url, "Timestamp"), None);
    assert_eq!(query_param(&request.url, "AppKey"), None);
    assert_eq!(query_param(&request.url, "shareCode").as_deref(), Some("ZnUNfa"));
}

fn backend(request: &HttpRequest) -> Result<HttpResponse, ShareError> {
    let url = &request.url;
    if url.contains("checkAccessCode.action") {
        return respond(200, format!(r#"{{"res_code":0,"shareId":{}}}"#, SHARE_ID));
    }
    if url.contains("getShareInfoByCodeV2.action") {
        assert_signed(request, "x1y2");
        return share_info_ok();
    }
    if url.contains("listShareDir.action") {
        assert_eq!(query_param(url, "shareId").as_deref(), Some(SHARE_ID));
        assert_eq!(query_param(url, "shareMode").as_deref(), Some("1"));
        assert_eq!(query_param(url, "accessCode").as_deref(), Some("x1y2"));
        assert_eq!(request.header_value("Cookie"), Some("share_ZnUNfa=x1y2"));

        let file_id = query_param(url, "fileId").unwrap();
        assert_eq!(query_param(url, "shareDirFileId").as_deref(), Some(file_id.as_str()));
        return match file_id.as_str() {
            ROOT_ID => respond(
                200,
                format!(
                    r#"{{"res_code":0,"fileListAO":{{"count":2,
                        "fileList":[{{"id":424803211905070200,"name":"a.txt","size":10,"md5":"0CC175B9C0F1B6A831C399E269772661"}}],
                        "folderList":[{{"id":{},"name":"sub","parentId":{}}}]}}}}"#,
                    SUB_ID, ROOT_ID
                ),
            ),
            SUB_ID => respond_json(json!({"res_code": 0, "fileListAO": {"count": 1,
                "fileList": [{"id": 7, "name": "b.txt", "size": 20, "md5": "900150983CD24FB0D6963F7D28E17F72"}],
                "folderList": []}})),
            _ => respond_json(json!({"res_code": "FileNotFound"})),
        };
    }
    respond(404, "")
}

#[tokio::test]
async fn test_resolve_189_share_with_access_code() {
    let transport = MockTransport::new(backend);
    let state = state_with(transport.clone());

    let manifest = ProviderId::Cloud189
        .resolve_share(&state, SHARE_URL, "x1y2", None)
        .await
        .unwrap();

    assert_eq!(manifest.total_files_count, 2);
    assert_eq!(manifest.total_size, 30);
    assert_eq!(manifest.files[0].path, "a.txt");
    assert_eq!(manifest.files[0].checksum, "0cc175b9c0f1b6a831c399e269772661");
    assert_eq!(manifest.files[1].path, "sub/b.txt");
    assert_eq!(manifest.files[1].checksum, "900150983cd24fb0d6963f7d28e17f72");
    assert!(manifest.meta.script_version.is_none());

    assert_eq!(transport.requests_to("checkAccessCode").len(), 1);
    assert_eq!(transport.requests_to("listShareDir").len(), 2);
}

#[tokio::test]
async fn test_resolve_189_access_code_in_url() {
    let transport = MockTransport::new(backend);
    let state = state_with(transport);

    let manifest = ProviderId::Cloud189
        .resolve_share(&state, "https://cloud.189.cn/t/ZnUNfa（访问码：x1y2）", "", None)
        .await
        .unwrap();
    assert_eq!(manifest.total_files_count, 2);
}

#[tokio::test]
async fn test_resolve_189_is_idempotent() {
    let transport = MockTransport::new(backend);
    let state = state_with(transport);

    let first = ProviderId::Cloud189
        .resolve_share(&state, SHARE_URL, "x1y2", None)
        .await
        .unwrap();
    let second = ProviderId::Cloud189
        .resolve_share(&state, SHARE_URL, "x1y2", None)
        .await
        .unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_189_xml_need_access_code() {
    let transport = MockTransport::new(|request| {
        assert!(request.url.contains("getShareInfoByCodeV2"));
        respond(
            200,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><error><res_code>40401</res_code>\
             <res_message>ShareAccessCode required</res_message></error>",
        )
    });
    let state = state_with(transport.clone());

    let err = ProviderId::Cloud189
        .resolve_share(&state, SHARE_URL, "", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ShareError::AccessCodeRequired(_)));
    // 没有访问码时不调用 checkAccessCode
    assert_eq!(transport.requests().len(), 1);
}

#[tokio::test]
async fn test_189_missing_file_id_needs_access_code() {
    let transport = MockTransport::new(|_| {
        respond_json(json!({"res_code": 0, "shareId": 1, "needAccessCode": "1"}))
    });
    let state = state_with(transport);

    let err = ProviderId::Cloud189
        .resolve_share(&state, SHARE_URL, "", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ShareError::AccessCodeRequired(_)));
}

#[tokio::test]
async fn test_189_share_not_found() {
    let transport = MockTransport::new(|_| {
        respond(200, "<error><res_code>ShareNotFound</res_code><res_message>分享不存在</res_message></error>")
    });
    let state = state_with(transport);

    let err = ProviderId::Cloud189
        .resolve_share(&state, SHARE_URL, "", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ShareError::ShareNotFoundOrExpired(_)));
}

#[tokio::test]
async fn test_189_check_access_code_failure_is_ignored() {
    let transport = MockTransport::new(|request| {
        let url = &request.url;
        if url.contains("checkAccessCode") {
            return Err(ShareError::Transport("timeout".into()));
        }
        if url.contains("getShareInfoByCodeV2") {
            return respond_json(json!({"res_code": 0, "fileId": "100", "shareMode": "0"}));
        }
        // shareId 回退为分享码
        assert_eq!(query_param(url, "shareId").as_deref(), Some("ZnUNfa"));
        respond_json(json!({"res_code": 0, "fileListAO": {"fileList": [], "folderList": []}}))
    });
    let state = state_with(transport.clone());

    let manifest = ProviderId::Cloud189
        .resolve_share(&state, SHARE_URL, "x1y2", None)
        .await
        .unwrap();
    assert_eq!(manifest.total_files_count, 0);
    assert_eq!(transport.requests_to("listShareDir").len(), 1);
}

#[tokio::test]
async fn test_189_paginates_by_page_size() {
    let transport = MockTransport::new(|request| {
        let url = &request.url;
        if url.contains("getShareInfoByCodeV2") {
            return respond_json(json!({"res_code": 0, "shareId": "55", "fileId": "100"}));
        }
        assert_eq!(query_param(url, "pageSize").as_deref(), Some("100"));
        let page: usize = query_param(url, "pageNum").unwrap().parse().unwrap();
        let count = match page {
            1 | 2 => 100,
            3 => 37,
            _ => panic!("unexpected page {page}"),
        };
        let files: Vec<_> = (0..count)
            .map(|i| json!({"id": page * 1000 + i, "name": format!("p{page}-{i}.bin"), "size": 1, "md5": "AA"}))
            .collect();
        respond_json(json!({"res_code": 0, "fileListAO": {"fileList": files, "folderList": []}}))
    });
    let state = state_with(transport.clone());

    let manifest = ProviderId::Cloud189
        .resolve_share(&state, SHARE_URL, "", None)
        .await
        .unwrap();

    assert_eq!(transport.requests_to("listShareDir").len(), 3);
    assert_eq!(manifest.total_files_count, 237);
    assert_eq!(manifest.total_size, 237);
    assert_eq!(manifest.files[0].path, "p1-0.bin");
    assert_eq!(manifest.files[236].path, "p3-36.bin");
}

#[tokio::test]
async fn test_189_subfolder_failure_keeps_collected_files() {
    let transport = MockTransport::new(|request| {
        let url = &request.url;
        if url.contains("getShareInfoByCodeV2") {
            return respond_json(json!({"res_code": 0, "shareId": "55", "fileId": "100"}));
        }
        match query_param(url, "fileId").as_deref() {
            Some("100") => respond_json(json!({"res_code": 0, "fileListAO": {
                "fileList": [{"id": 1, "name": "root.txt", "size": 3, "md5": "aa"}],
                "folderList": [{"id": 200, "name": "locked"}, {"id": 300, "name": "open"}]}})),
            Some("200") => respond_json(json!({"res_code": "FileNotFound", "res_message": "not found"})),
            Some("300") => respond_json(json!({"res_code": 0, "fileListAO": {
                "fileList": [{"id": 2, "name": "x.txt", "size": 4}]}})),
            _ => respond(404, ""),
        }
    });
    let state = state_with(transport);

    let manifest = ProviderId::Cloud189
        .resolve_share(&state, SHARE_URL, "", None)
        .await
        .unwrap();

    let paths: Vec<&str> = manifest.files.iter().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, ["root.txt", "open/x.txt"]);
    assert_eq!(manifest.files[1].checksum, "");
    assert_eq!(manifest.total_size, 7);
}

#[tokio::test]
async fn test_189_invalid_link() {
    let transport = MockTransport::new(|_| respond(500, ""));
    let state = state_with(transport.clone());

    let err = ProviderId::Cloud189
        .resolve_share(&state, "https://cloud.189.cn/web/main/", "", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ShareError::InvalidLink { .. }));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn test_189_login_page_at_root_listing_is_error() {
    let transport = MockTransport::new(|request| {
        if request.url.contains("getShareInfoByCodeV2") {
            return respond_json(json!({"res_code": 0, "fileId": "100"}));
        }
        respond(200, "<html><body>请先登录</body></html>")
    });
    let state = state_with(transport.clone());

    let err = ProviderId::Cloud189
        .resolve_share(&state, SHARE_URL, "", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ShareError::MalformedResponse { .. }));
    assert_eq!(transport.requests_to("listShareDir").len(), 1);
}

#[tokio::test]
async fn test_189_login_page_at_handshake_is_error() {
    let transport = MockTransport::new(|_| respond(200, "<html><body>请先登录</body></html>"));
    let state = state_with(transport);

    let err = ProviderId::Cloud189
        .resolve_share(&state, SHARE_URL, "", None)
        .await
        .unwrap_err();
    assert!(matches!(err, ShareError::MalformedResponse { .. }));
}

#[tokio::test]
async fn test_auto_detect_routes_189_link() {
    let transport = MockTransport::new(backend);
    let state = state_with(transport.clone());

    let manifest = rapid::resolve_share(&state, SHARE_URL, "x1y2", None)
        .await
        .unwrap();
    assert_eq!(manifest.total_files_count, 2);
    assert!(manifest.meta.script_version.is_none());
    assert_eq!(transport.requests_to("getShareInfoByCodeV2").len(), 1);
}

#[tokio::test]
async fn test_auto_detect_unknown_host_is_invalid_link() {
    let transport = MockTransport::new(|_| respond(500, ""));
    let state = state_with(transport.clone());

    for url in [
        "https://example.com/t/ZnUNfa",
        "https://evil189.cn/t/ZnUNfa",
        "https://example.com/s/abc?from=pan.quark.cn",
    ] {
        let err = rapid::resolve_share(&state, url, "", None).await.unwrap_err();
        assert!(matches!(err, ShareError::InvalidLink { .. }), "{url}");
    }
    assert!(transport.requests().is_empty());
}

// ─── Store Delivery Lookup ───
// Fallback for UWP packages the mirror no longer serves: ask the Windows Update
// delivery service for the file URLs behind a store update id.

use quick_xml::events::Event;
use quick_xml::Reader;
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::core::error::{SyncError, SyncResult};
use crate::core::http::{ensure_success, with_retry, RetryPolicy};

pub const FE3_URL: &str =
    "https://fe3cr.delivery.mp.microsoft.com/ClientWebService/client.asmx/secured";
const PACKAGE_HOST: &str = "tlu.dl.delivery.mp.microsoft.com";
/// Blockmap URLs on the package host all have exactly this length.
const BLOCKMAP_URL_LEN: usize = 99;

const REQUEST_TEMPLATE: &str = r#"<s:Envelope xmlns:a="http://www.w3.org/2005/08/addressing" xmlns:s="http://www.w3.org/2003/05/soap-envelope">
  <s:Header>
    <a:Action s:mustUnderstand="1">http://www.microsoft.com/SoftwareDistribution/Server/ClientWebService/GetExtendedUpdateInfo2</a:Action>
    <a:MessageID>urn:uuid:{message_id}</a:MessageID>
    <a:To s:mustUnderstand="1">https://fe3.delivery.mp.microsoft.com/ClientWebService/client.asmx/secured</a:To>
    <o:Security s:mustUnderstand="1" xmlns:o="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd">
      <Timestamp xmlns="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd">
        <Created>2019-01-01T00:00:00.000Z</Created>
        <Expires>2100-01-01T00:00:00.000Z</Expires>
      </Timestamp>
      <wuws:WindowsUpdateTicketsToken wsu:id="ClientMSA" xmlns:wsu="http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-utility-1.0.xsd" xmlns:wuws="http://schemas.microsoft.com/msus/2014/10/WindowsUpdateAuthorization">
        <TicketType Name="AAD" Version="1.0" Policy="MBI_SSL"></TicketType>
      </wuws:WindowsUpdateTicketsToken>
    </o:Security>
  </s:Header>
  <s:Body>
    <GetExtendedUpdateInfo2 xmlns="http://www.microsoft.com/SoftwareDistribution/Server/ClientWebService">
      <updateIDs>
        <UpdateIdentity>
          <UpdateID>{update_id}</UpdateID>
          <RevisionNumber>1</RevisionNumber>
        </UpdateIdentity>
      </updateIDs>
      <infoTypes>
        <XmlUpdateFragmentType>FileUrl</XmlUpdateFragmentType>
        <XmlUpdateFragmentType>FileDecryption</XmlUpdateFragmentType>
      </infoTypes>
      <deviceAttributes>E:BranchReadinessLevel=CBB&amp;DchuNvidiaGrfxExists=1&amp;ProcessorIdentifier=Intel64%20Family%206%20Model%2063%20Stepping%202&amp;CurrentBranch=rs4_release&amp;DataVer_RS5=1942&amp;FlightRing=Retail&amp;AttrDataVer=57&amp;InstallLanguage=en-US&amp;OSUILocale=en-US&amp;InstallationType=Client&amp;FlightingBranchName=&amp;Version_RS5=10&amp;UpgEx_RS5=Green&amp;GStatus_RS5=2&amp;OSSkuId=48&amp;App=WU&amp;InstallDate=1529700913&amp;ProcessorManufacturer=GenuineIntel&amp;AppVer=10.0.17134.471&amp;OSArchitecture=AMD64&amp;UpdateManagementGroup=2&amp;IsDeviceRetailDemo=0&amp;HidOverGattReg=C%3A%5CWINDOWS%5CSystem32%5CDriverStore%5CFileRepository%5Chidbthle.inf_amd64_467f181075371c89%5CMicrosoft.Bluetooth.Profiles.HidOverGatt.dll&amp;IsFlightingEnabled=0&amp;DchuIntelGrfxExists=1&amp;TelemetryLevel=1&amp;DefaultUserRegion=244&amp;DchuAmdGrfxExists=1&amp;Free=gt64&amp;OSVersion=10.0.17134.1&amp;DeviceFamily=Windows.Desktop</deviceAttributes>
    </GetExtendedUpdateInfo2>
  </s:Body>
</s:Envelope>"#;

pub fn build_request(update_id: &str) -> String {
    REQUEST_TEMPLATE
        .replace("{message_id}", &uuid::Uuid::new_v4().to_string())
        .replace("{update_id}", update_id)
}

/// Every `<FileLocation><Url>` value in a `GetExtendedUpdateInfo2` response.
pub fn file_urls(xml: &str) -> SyncResult<Vec<String>> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut urls = Vec::new();
    let mut in_location = false;
    let mut in_url = false;
    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"FileLocation" => in_location = true,
                b"Url" if in_location => in_url = true,
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"FileLocation" => in_location = false,
                b"Url" => in_url = false,
                _ => {}
            },
            Event::Text(text) if in_url => urls.push(text.unescape()?.into_owned()),
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(urls)
}

/// Pick the package URL out of the response, skipping blockmaps.
pub fn select_package_url(urls: &[String]) -> Option<&str> {
    urls.iter()
        .rev()
        .find(|url| url.contains(PACKAGE_HOST) && url.len() != BLOCKMAP_URL_LEN)
        .map(String::as_str)
}

/// Resolve a store update id to a direct package URL.
pub async fn resolve_package_url(update_id: &str, retry: RetryPolicy) -> SyncResult<String> {
    // The delivery endpoint serves a certificate chain that does not validate
    // against public roots.
    let insecure = reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()?;

    let body = build_request(update_id);
    let xml = with_retry(retry, FE3_URL, || {
        let request = insecure
            .post(FE3_URL)
            .header(CONTENT_TYPE, "application/soap+xml; charset=utf-8")
            .body(body.clone());
        async move {
            let response = ensure_success(FE3_URL, request.send().await?)?;
            Ok(response.text().await?)
        }
    })
    .await?;

    let urls = file_urls(&xml)?;
    debug!("Store returned {} file location(s) for {}", urls.len(), update_id);
    select_package_url(&urls)
        .map(str::to_string)
        .ok_or_else(|| SyncError::NotFound(format!("no package URL for update {update_id}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESPONSE: &str = r#"<s:Envelope xmlns:s="http://www.w3.org/2003/05/soap-envelope">
  <s:Body>
    <GetExtendedUpdateInfo2Response xmlns="http://www.microsoft.com/SoftwareDistribution/Server/ClientWebService">
      <GetExtendedUpdateInfo2Result>
        <FileLocations>
          <FileLocation>
            <FileDigest>abc=</FileDigest>
            <Url>http://tlu.dl.delivery.mp.microsoft.com/filestreamingservice/files/00000000-aaaa?P1=1</Url>
          </FileLocation>
          <FileLocation>
            <FileDigest>def=</FileDigest>
            <Url>http://tlu.dl.delivery.mp.microsoft.com/filestreamingservice/files/package?P1=1&amp;P2=404&amp;P3=2</Url>
          </FileLocation>
          <FileLocation>
            <Url>http://other.host.example/package</Url>
          </FileLocation>
        </FileLocations>
      </GetExtendedUpdateInfo2Result>
    </GetExtendedUpdateInfo2Response>
  </s:Body>
</s:Envelope>"#;

    #[test]
    fn file_urls_are_unescaped() {
        let urls = file_urls(RESPONSE).unwrap();
        assert_eq!(urls.len(), 3);
        assert!(urls[1].ends_with("P1=1&P2=404&P3=2"));
    }

    #[test]
    fn blockmap_length_urls_are_skipped() {
        let blockmap = format!("http://{PACKAGE_HOST}/{}", "x".repeat(BLOCKMAP_URL_LEN - 8 - PACKAGE_HOST.len()));
        assert_eq!(blockmap.len(), BLOCKMAP_URL_LEN);
        let package = format!("http://{PACKAGE_HOST}/files/package.appx");
        let urls = vec![package.clone(), blockmap, "http://elsewhere/x".into()];
        assert_eq!(select_package_url(&urls), Some(package.as_str()));
    }

    #[test]
    fn request_embeds_update_id() {
        let body = build_request("1d3a8a4e-0e5c-4b6b-9b0a-7d2c4f1e9a10");
        assert!(body.contains("<UpdateID>1d3a8a4e-0e5c-4b6b-9b0a-7d2c4f1e9a10</UpdateID>"));
        assert!(!body.contains("{update_id}"));
    }
}

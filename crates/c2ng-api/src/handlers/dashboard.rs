//! HTML dashboard: the session list joined with recent link quality.

use std::sync::Arc;

use axum::extract::State;
use axum::response::Html;

use c2ng_core::stats::{rtt_class, signal_class, SessionStats};

use crate::state::AppState;

/// `GET /gui/dashboard`.
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Html<String> {
    match state.stats.list_sessions().await {
        Ok(sessions) => Html(render(&sessions)),
        Err(e) => {
            tracing::error!("Failed to list sessions: {e}");
            Html(
                "<html><body><h1>C2NG</h1><p>Dashboard is unavailable.</p></body></html>"
                    .to_string(),
            )
        }
    }
}

fn render(sessions: &[SessionStats]) -> String {
    let mut rows = String::new();

    for session in sessions {
        let signal = session
            .avg_signal
            .map(|v| format!("{v:.1}"))
            .unwrap_or_else(|| "No Data".to_string());
        let rtt = session
            .avg_rtt
            .map(|v| format!("{v:.1}"))
            .unwrap_or_else(|| "No Data".to_string());

        rows.push_str(&format!(
            "<tr>\
             <td>{uasid}</td>\
             <td>{ua}</td>\
             <td>{adx}</td>\
             <td class=\"{signal_class}\">{signal}</td>\
             <td class=\"{rtt_class}\">{rtt}</td>\
             </tr>",
            uasid = session.uasid,
            ua = if session.ua_connected { "yes" } else { "no" },
            adx = if session.adx_connected { "yes" } else { "no" },
            signal_class = signal_class(session.avg_signal),
            rtt_class = rtt_class(session.avg_rtt),
        ));
    }

    format!(
        "<html><head><title>C2NG Dashboard</title><style>\
         table {{ border-collapse: collapse; }}\
         td, th {{ border: 1px solid #999; padding: 4px 8px; }}\
         .excellent {{ background: #b7e1cd; }}\
         .good {{ background: #d9ead3; }}\
         .fair {{ background: #fff2cc; }}\
         .poor {{ background: #f4cccc; }}\
         .none {{ background: #eee; }}\
         </style></head><body>\
         <h1>C2NG Sessions</h1>\
         <table>\
         <tr><th>UAS ID</th><th>UA</th><th>ADX</th><th>Signal (RSRP)</th><th>RTT</th></tr>\
         {rows}\
         </table></body></html>"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_rows_with_classes() {
        let sessions = vec![SessionStats {
            uasid: "drone-1".to_string(),
            ua_connected: true,
            adx_connected: false,
            avg_signal: Some(-95.0),
            avg_rtt: None,
        }];

        let html = render(&sessions);
        assert!(html.contains("drone-1"));
        assert!(html.contains("class=\"fair\">-95.0"));
        assert!(html.contains("class=\"none\">No Data"));
    }
}

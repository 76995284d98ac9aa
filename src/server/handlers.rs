//! Request handlers: Load, UpdateItem, UpdateModule, RemoveItem, RemoveModule,
//! Recalculate, GetRatsnest, SetVisible, IsDirty, AddSimple, ClearSimple, GetStatus

use crate::board::{Board, BoardItem, Module};
use crate::ratsnest::{ItemId, ModuleId, NetCode, RatsnestData, RatsnestOptions};
use crate::server::protocol::{error_codes, Request, Response};
use crate::server::state::ServerState;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Instant;

/// Routes a request to its handler
pub fn dispatch(state: &mut ServerState, request: Request) -> Response {
    let Request { id, method, params } = request;
    match method.as_str() {
        "Load" => handle_load(state, id, params),
        "UpdateItem" => handle_update_item(state, id, params),
        "UpdateModule" => handle_update_module(state, id, params),
        "RemoveItem" => handle_remove_item(state, id, params),
        "RemoveModule" => handle_remove_module(state, id, params),
        "Recalculate" => handle_recalculate(state, id, params),
        "GetRatsnest" => handle_get_ratsnest(state, id, params),
        "SetVisible" => handle_set_visible(state, id, params),
        "IsDirty" => handle_is_dirty(state, id, params),
        "AddSimple" => handle_add_simple(state, id, params),
        "ClearSimple" => handle_clear_simple(state, id),
        "GetStatus" => handle_get_status(state, id),
        _ => Response::error(
            id,
            error_codes::METHOD_NOT_FOUND,
            format!("Unknown method: {}", method),
        ),
    }
}

fn parse_params<T: DeserializeOwned>(id: &Option<Value>, params: Option<Value>) -> Result<T, Response> {
    serde_json::from_value(params.unwrap_or_else(|| json!({}))).map_err(|e| {
        Response::error(
            id.clone(),
            error_codes::INVALID_PARAMS,
            format!("Invalid params: {}", e),
        )
    })
}

fn loaded<'a>(state: &'a ServerState, id: &Option<Value>) -> Result<&'a RatsnestData, Response> {
    state.ratsnest.as_ref().ok_or_else(|| no_board(id))
}

fn loaded_mut<'a>(
    state: &'a mut ServerState,
    id: &Option<Value>,
) -> Result<&'a mut RatsnestData, Response> {
    state.ratsnest.as_mut().ok_or_else(|| no_board(id))
}

fn net_out_of_range(id: Option<Value>, net: NetCode, max_net: NetCode) -> Response {
    tracing::warn!("[Server] Rejected net {} (max_net {})", net, max_net);
    Response::error(
        id,
        error_codes::INVALID_PARAMS,
        format!("Invalid params: net {} exceeds max_net {}", net, max_net),
    )
}

fn no_board(id: &Option<Value>) -> Response {
    Response::error(
        id.clone(),
        error_codes::NO_BOARD_LOADED,
        "No board loaded. Call Load first.".to_string(),
    )
}

#[derive(Deserialize)]
struct LoadParams {
    #[serde(default)]
    board: Option<Board>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    options: Option<RatsnestOptions>,
}

fn load_board(params: &mut LoadParams) -> anyhow::Result<Board> {
    match (params.board.take(), &params.path) {
        (Some(board), _) => Ok(board),
        (None, Some(path)) => Board::load_json(path),
        (None, None) => anyhow::bail!("expected either 'board' or 'path'"),
    }
}

/// Handle Load request - builds the ratsnest for a board snapshot
pub fn handle_load(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    let mut params: LoadParams = match parse_params(&id, params) {
        Ok(p) => p,
        Err(r) => return r,
    };

    let start = Instant::now();
    let board = match load_board(&mut params) {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!("[Server] Load failed: {:#}", e);
            return Response::error(id, error_codes::LOAD_FAILED, format!("{:#}", e));
        }
    };

    let options = params.options.take().unwrap_or_else(|| state.options.clone());
    let max_net = board.max_net();
    if max_net > options.max_net {
        return net_out_of_range(id, max_net, options.max_net);
    }
    state.options = options;
    let mut ratsnest = RatsnestData::new(state.options.clone());
    ratsnest.process_board(&board);
    ratsnest.recalculate(None);

    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    let unconnected = ratsnest.unconnected_count();
    tracing::info!(
        "[Server] Loaded board: {} nets, {} unconnected in {:.2}ms",
        ratsnest.nets().len().saturating_sub(1),
        unconnected,
        elapsed_ms
    );

    let net_count = ratsnest.nets().len().saturating_sub(1);
    state.board_path = params.path;
    state.ratsnest = Some(ratsnest);

    Response::success(id, json!({
        "status": "ok",
        "net_count": net_count,
        "unconnected_count": unconnected,
        "elapsed_ms": elapsed_ms
    }))
}

/// Handle UpdateItem request - re-adds an item with its current geometry and net
pub fn handle_update_item(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    #[derive(Deserialize)]
    struct UpdateItemParams {
        item: BoardItem,
    }

    let params: UpdateItemParams = match parse_params(&id, params) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let ratsnest = match loaded_mut(state, &id) {
        Ok(r) => r,
        Err(r) => return r,
    };

    let net = params.item.net();
    if !ratsnest.accepts_net(net) {
        return net_out_of_range(id, net, ratsnest.options().max_net);
    }
    ratsnest.update(&params.item);
    Response::success(id, json!({
        "status": "ok",
        "net": net,
        "dirty": ratsnest.is_dirty(net)
    }))
}

/// Handle UpdateModule request - re-adds every pad of a module
pub fn handle_update_module(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    #[derive(Deserialize)]
    struct UpdateModuleParams {
        module: Module,
    }

    let params: UpdateModuleParams = match parse_params(&id, params) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let ratsnest = match loaded_mut(state, &id) {
        Ok(r) => r,
        Err(r) => return r,
    };

    if let Some(pad) = params.module.pads.iter().find(|p| !ratsnest.accepts_net(p.net)) {
        return net_out_of_range(id, pad.net, ratsnest.options().max_net);
    }
    ratsnest.update_module(&params.module);
    Response::success(id, json!({
        "status": "ok",
        "pad_count": params.module.pads.len()
    }))
}

/// Handle RemoveItem request
pub fn handle_remove_item(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    #[derive(Deserialize)]
    struct RemoveItemParams {
        item_id: ItemId,
    }

    let params: RemoveItemParams = match parse_params(&id, params) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let ratsnest = match loaded_mut(state, &id) {
        Ok(r) => r,
        Err(r) => return r,
    };

    let net = ratsnest.item_net(params.item_id);
    ratsnest.remove(params.item_id);
    Response::success(id, json!({
        "status": "ok",
        "net": net
    }))
}

/// Handle RemoveModule request - removes every pad of a module
pub fn handle_remove_module(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    #[derive(Deserialize)]
    struct RemoveModuleParams {
        module_id: ModuleId,
    }

    let params: RemoveModuleParams = match parse_params(&id, params) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let ratsnest = match loaded_mut(state, &id) {
        Ok(r) => r,
        Err(r) => return r,
    };

    ratsnest.remove_module(params.module_id);
    Response::success(id, json!({ "status": "ok" }))
}

#[derive(Deserialize, Default)]
struct NetParams {
    #[serde(default)]
    net: Option<NetCode>,
}

/// Handle Recalculate request - resolves one net or every dirty net
pub fn handle_recalculate(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    let params: NetParams = match parse_params(&id, params) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let ratsnest = match loaded_mut(state, &id) {
        Ok(r) => r,
        Err(r) => return r,
    };

    let start = Instant::now();
    ratsnest.recalculate(params.net);
    Response::success(id, json!({
        "status": "ok",
        "unconnected_count": ratsnest.unconnected_count(),
        "elapsed_ms": start.elapsed().as_secs_f64() * 1000.0
    }))
}

/// Handle GetRatsnest request - returns airwires for drawing
pub fn handle_get_ratsnest(state: &ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    let params: NetParams = match parse_params(&id, params) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let ratsnest = match loaded(state, &id) {
        Ok(r) => r,
        Err(r) => return r,
    };

    let airwires: Vec<_> = ratsnest
        .airwires()
        .into_iter()
        .filter(|w| params.net.map_or(true, |n| w.net == n))
        .collect();

    match serde_json::to_value(&airwires) {
        Ok(wires) => Response::success(id, json!({
            "airwires": wires,
            "unconnected_count": ratsnest.unconnected_count()
        })),
        Err(e) => Response::error(id, error_codes::INTERNAL_ERROR, e.to_string()),
    }
}

/// Handle SetVisible request - toggles drawing of one net's ratsnest
pub fn handle_set_visible(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    #[derive(Deserialize)]
    struct SetVisibleParams {
        net: NetCode,
        visible: bool,
    }

    let params: SetVisibleParams = match parse_params(&id, params) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let ratsnest = match loaded_mut(state, &id) {
        Ok(r) => r,
        Err(r) => return r,
    };

    ratsnest.set_visible(params.net, params.visible);
    Response::success(id, json!({ "status": "ok" }))
}

/// Handle IsDirty request
pub fn handle_is_dirty(state: &ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    #[derive(Deserialize)]
    struct IsDirtyParams {
        net: NetCode,
    }

    let params: IsDirtyParams = match parse_params(&id, params) {
        Ok(p) => p,
        Err(r) => return r,
    };
    let ratsnest = match loaded(state, &id) {
        Ok(r) => r,
        Err(r) => return r,
    };

    Response::success(id, json!({
        "dirty": ratsnest.is_dirty(params.net),
        "connected": ratsnest.is_connected(params.net)
    }))
}

/// Handle AddSimple request - draws an item or module in simple mode while dragging
pub fn handle_add_simple(state: &mut ServerState, id: Option<Value>, params: Option<Value>) -> Response {
    #[derive(Deserialize)]
    struct AddSimpleParams {
        #[serde(default)]
        item_id: Option<ItemId>,
        #[serde(default)]
        module_id: Option<ModuleId>,
    }

    let params: AddSimpleParams = match parse_params(&id, params) {
        Ok(p) => p,
        Err(r) => return r,
    };
    if params.item_id.is_none() && params.module_id.is_none() {
        return Response::error(
            id,
            error_codes::INVALID_PARAMS,
            "Invalid params: expected item_id or module_id".to_string(),
        );
    }
    let ratsnest = match loaded_mut(state, &id) {
        Ok(r) => r,
        Err(r) => return r,
    };

    if let Some(item) = params.item_id {
        ratsnest.add_simple(item);
    }
    if let Some(module) = params.module_id {
        ratsnest.add_simple_module(module);
    }
    Response::success(id, json!({ "status": "ok" }))
}

/// Handle ClearSimple request
pub fn handle_clear_simple(state: &mut ServerState, id: Option<Value>) -> Response {
    match loaded_mut(state, &id) {
        Ok(ratsnest) => {
            ratsnest.clear_simple();
            Response::success(id, json!({ "status": "ok" }))
        }
        Err(r) => r,
    }
}

/// Handle GetStatus request - per-net summary
pub fn handle_get_status(state: &ServerState, id: Option<Value>) -> Response {
    let ratsnest = match loaded(state, &id) {
        Ok(r) => r,
        Err(r) => return r,
    };

    let nets: Vec<Value> = ratsnest
        .nets()
        .iter()
        .enumerate()
        .skip(1)
        .filter(|(_, n)| !n.is_empty())
        .map(|(code, n)| {
            json!({
                "net": code,
                "nodes": n.links().node_count(),
                "unconnected": n.unconnected().len(),
                "dirty": n.is_dirty(),
                "visible": n.is_visible()
            })
        })
        .collect();

    Response::success(id, json!({
        "board_path": state.board_path,
        "nets": nets,
        "unconnected_count": ratsnest.unconnected_count()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(method: &str, params: Value) -> Request {
        Request {
            id: Some(json!(1)),
            method: method.to_string(),
            params: Some(params),
        }
    }

    #[test]
    fn test_requires_loaded_board() {
        let mut state = ServerState::new();
        let response = dispatch(&mut state, request("Recalculate", json!({})));
        assert_eq!(response.error.unwrap().code, error_codes::NO_BOARD_LOADED);
    }

    #[test]
    fn test_unknown_method() {
        let mut state = ServerState::new();
        let response = dispatch(&mut state, request("Route", json!({})));
        assert!(response.is_error());
        assert_eq!(response.error.unwrap().code, error_codes::METHOD_NOT_FOUND);
    }

    #[test]
    fn test_load_without_board_fails() {
        let mut state = ServerState::new();
        let response = dispatch(&mut state, request("Load", json!({})));
        assert_eq!(response.error.unwrap().code, error_codes::LOAD_FAILED);
        assert!(!state.is_board_loaded());
    }

    #[test]
    fn test_out_of_range_net_is_rejected() {
        let mut state = ServerState::new();
        dispatch(&mut state, request("Load", json!({
            "board": { "vias": [{ "id": 1, "net": 1, "position": { "x": 0, "y": 0 } }] }
        })));

        for net in [json!(u64::MAX), json!(1_000_000_000_000u64)] {
            let response = dispatch(&mut state, request("UpdateItem", json!({
                "item": { "type": "pad", "id": 2, "net": net, "position": { "x": 5, "y": 5 } }
            })));
            assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);
        }
        let response = dispatch(&mut state, request("UpdateModule", json!({
            "module": { "id": 3, "pads": [{ "id": 4, "net": u64::MAX, "position": { "x": 1, "y": 1 } }] }
        })));
        assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);

        let ratsnest = state.ratsnest.as_ref().unwrap();
        assert_eq!(ratsnest.nets().len(), 2);
        assert_eq!(ratsnest.net(1).unwrap().links().node_count(), 1);

        let response = dispatch(&mut state, request("Load", json!({
            "board": { "vias": [{ "id": 1, "net": u64::MAX, "position": { "x": 0, "y": 0 } }] }
        })));
        assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);
        assert_eq!(state.ratsnest.as_ref().unwrap().nets().len(), 2);
    }

    #[test]
    fn test_invalid_params() {
        let mut state = ServerState::new();
        dispatch(&mut state, request("Load", json!({ "board": {} })));
        let response = dispatch(&mut state, request("SetVisible", json!({ "net": "x" })));
        assert_eq!(response.error.unwrap().code, error_codes::INVALID_PARAMS);
    }
}
